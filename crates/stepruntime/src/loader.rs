use crate::store::DefinitionStore;
use stepcore::{Result, WorkflowDefinition};
use std::path::Path;

/// Read one workflow definition from a JSON file
pub fn load_definition(path: &Path) -> Result<WorkflowDefinition> {
    let file = std::fs::File::open(path)?;
    let definition = serde_json::from_reader(std::io::BufReader::new(file))?;
    Ok(definition)
}

/// Store every `*.json` definition found in `dir`, in filename order
///
/// Files that fail to parse are logged and skipped. Returns the number
/// of definitions stored.
pub async fn load_definitions_dir(
    dir: &Path,
    store: &dyn DefinitionStore,
    owner: &str,
) -> Result<usize> {
    let mut paths = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.extension() == Some("json".as_ref()) {
            paths.push(path);
        }
    }
    paths.sort();
    
    let mut loaded = 0;
    for path in paths {
        match load_definition(&path) {
            Ok(definition) => {
                let name = path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned());
                store.put(owner, name, definition).await?;
                loaded += 1;
            }
            Err(e) => {
                tracing::warn!("Skipping {}: {}", path.display(), e);
            }
        }
    }
    
    tracing::info!("Loaded {} workflow definitions from {}", loaded, dir.display());
    Ok(loaded)
}
