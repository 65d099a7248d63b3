use anyhow::{bail, Result};
use dynamo_console::session::{FileStorage, NewProfile, ProfileStore, StorageBackend};

use crate::cli::ProfileCommand;

fn masked(key: &str) -> String {
    let visible: String = key.chars().rev().take(4).collect::<Vec<_>>().into_iter().rev().collect();
    if key.chars().count() <= 4 {
        visible
    } else {
        format!("****{visible}")
    }
}

pub fn run<S: StorageBackend>(store: &ProfileStore<S>, action: ProfileCommand) -> Result<()> {
    match action {
        ProfileCommand::List => {
            let profiles = store.list()?;
            if profiles.is_empty() {
                println!("No saved profiles.");
                return Ok(());
            }
            let mut table = super::new_table(["ID", "Name", "Key", "Endpoint"]);
            for profile in profiles {
                table.add_row(vec![
                    profile.id,
                    profile.name,
                    masked(&profile.key),
                    profile.endpoint,
                ]);
            }
            println!("{table}");
        }
        ProfileCommand::Add {
            name,
            key,
            endpoint,
        } => {
            let profile = store.add(NewProfile {
                name,
                key,
                endpoint,
            })?;
            println!("Saved profile {} ({})", profile.name, profile.id);
        }
        ProfileCommand::Remove { id } => {
            if !store.remove(&id)? {
                bail!("no profile with id {id}");
            }
            println!("Removed profile {id}");
        }
    }
    Ok(())
}

pub fn execute(action: ProfileCommand) -> Result<()> {
    let store = ProfileStore::new(FileStorage::in_config_dir()?);
    run(&store, action)
}

#[cfg(test)]
mod tests {
    use super::*;
    use dynamo_console::session::MemoryStorage;

    #[test]
    fn test_key_is_masked() {
        assert_eq!(masked("AKIAEXAMPLE1234"), "****1234");
        assert_eq!(masked("abc"), "abc");
    }

    #[test]
    fn test_add_then_remove() {
        let store = ProfileStore::new(MemoryStorage::new());

        run(
            &store,
            ProfileCommand::Add {
                name: "local".into(),
                key: "local".into(),
                endpoint: "http://localhost:8000".into(),
            },
        )
        .unwrap();
        let id = store.list().unwrap()[0].id.clone();

        run(&store, ProfileCommand::Remove { id: id.clone() }).unwrap();
        assert!(store.list().unwrap().is_empty());
        assert!(run(&store, ProfileCommand::Remove { id }).is_err());
    }
}
