//! Content catalog loading

use crate::error::ServiceError;
use skirmish_battle::formula::FormulaEvaluator;
use skirmish_battle::{Catalog, CatalogReport};
use std::fs;
use std::path::Path;

/// Read and compile the catalog at `path`. Entries that fail to compile
/// are skipped and listed in the report; only an unreadable or malformed
/// file is an error.
pub fn load_catalog(
    path: impl AsRef<Path>,
    evaluator: &dyn FormulaEvaluator,
) -> Result<(Catalog, CatalogReport), ServiceError> {
    let path = path.as_ref();
    let text = fs::read_to_string(path).map_err(|source| ServiceError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let (catalog, report) =
        Catalog::from_json(&text, evaluator).map_err(|source| ServiceError::Catalog {
            path: path.to_path_buf(),
            source,
        })?;

    tracing::info!(
        path = %path.display(),
        abilities = report.abilities,
        effects = report.effects,
        statuses = report.statuses,
        skipped = report.skipped.len(),
        "catalog loaded"
    );
    Ok((catalog, report))
}

#[cfg(test)]
mod tests {
    use super::*;
    use skirmish_battle::{ContentId, ExpressionEvaluator};
    use tempfile::TempDir;

    #[test]
    fn loads_and_reports_skips() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("catalog.json");
        fs::write(
            &path,
            r#"{ "abilities": [
                { "id": 1, "name": "poke", "duration": 0.2, "effects": [
                    { "id": 10, "trigger": "on_cast", "target": "target",
                      "kind": { "type": "damage", "formula": "atk * 0.5" } } ] },
                { "id": 2, "name": "typo", "duration": 0.2, "effects": [
                    { "id": 20, "trigger": "on_cast", "target": "target",
                      "kind": { "type": "damage", "formula": "atack * 0.5" } } ] }
            ] }"#,
        )
        .unwrap();

        let (catalog, report) = load_catalog(&path, &ExpressionEvaluator).unwrap();
        assert!(catalog.ability(ContentId(1)).is_some());
        assert!(catalog.ability(ContentId(2)).is_none());
        assert_eq!(report.skipped.len(), 2);
    }

    #[test]
    fn missing_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let result = load_catalog(dir.path().join("nope.json"), &ExpressionEvaluator);
        assert!(matches!(result, Err(ServiceError::Read { .. })));
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("catalog.json");
        fs::write(&path, r#"{ "abilities": 3 }"#).unwrap();

        let result = load_catalog(&path, &ExpressionEvaluator);
        assert!(matches!(result, Err(ServiceError::Catalog { .. })));
    }
}
