//! The fixture scenarios and the files they are written to.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use crdt_changes::{write_all, ChangeOptions, Document, DocumentError, FieldMap, TimeSource};
use log::info;

pub const ACTOR: &str = "414141";
pub const FIXED_TIME: i64 = 1_741_534_262;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scenario {
    /// `{a: 1}`, then `a = 2`.
    One,
    /// `{a: 1, b: {}}`, then `a = 2` and `b = {a: 3}` at a fixed time.
    Two,
}

impl Scenario {
    pub const ALL: [Scenario; 2] = [Scenario::One, Scenario::Two];

    pub fn file_name(self) -> &'static str {
        match self {
            Scenario::One => "change1.bin",
            Scenario::Two => "change2.bin",
        }
    }

    pub fn build(self, clock: Arc<dyn TimeSource>) -> Result<Document, DocumentError> {
        match self {
            Scenario::One => {
                let initial = FieldMap::new().with("a", 1);
                let mut doc = Document::create_with_clock(initial, ACTOR, clock)?;
                doc.change(ChangeOptions::default(), |v| {
                    v.set("a", 2);
                })?;
                Ok(doc)
            }
            Scenario::Two => {
                let initial = FieldMap::new().with("a", 1).with("b", FieldMap::new());
                let mut doc = Document::create_with_clock(initial, ACTOR, clock)?;
                doc.change(ChangeOptions::at(FIXED_TIME), |v| {
                    v.set("a", 2);
                })?;
                doc.change(ChangeOptions::at(FIXED_TIME), |v| {
                    v.set("b", FieldMap::new().with("a", 3));
                })?;
                Ok(doc)
            }
        }
    }
}

/// Builds `scenario` and writes its full history to `out_dir`, replacing any
/// earlier file of the same name.
pub fn generate(
    scenario: Scenario,
    out_dir: &Path,
    clock: Arc<dyn TimeSource>,
) -> anyhow::Result<PathBuf> {
    let doc = scenario
        .build(clock)
        .with_context(|| format!("building scenario {scenario:?}"))?;
    let path = out_dir.join(scenario.file_name());
    match fs::remove_file(&path) {
        Ok(()) => info!("replacing {}", path.display()),
        Err(err) if err.kind() == ErrorKind::NotFound => {}
        Err(err) => return Err(err).with_context(|| format!("removing {}", path.display())),
    }
    let changes = doc.get_all_changes();
    write_all(&changes, &path).with_context(|| format!("writing {}", path.display()))?;
    info!("wrote {} changes to {}", changes.len(), path.display());
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crdt_changes::{read_all, FixedClock, ObjId, Op};

    #[test]
    fn scenario_one_has_two_changes() {
        let doc = Scenario::One.build(Arc::new(FixedClock(0))).unwrap();
        assert_eq!(doc.get_all_changes().len(), 2);
        assert_eq!(doc.value(), FieldMap::new().with("a", 2));
    }

    #[test]
    fn scenario_two_creates_nested_object_last() {
        let doc = Scenario::Two.build(Arc::new(FixedClock(0))).unwrap();
        let changes = doc.get_all_changes();
        assert_eq!(changes.len(), 3);
        assert!(changes[2]
            .ops
            .iter()
            .any(|op| matches!(op, Op::MakeMap { obj: ObjId::Root, key, .. } if key == "b")));
    }

    #[test]
    fn generate_is_reproducible_with_a_fixed_clock() {
        let dir = tempfile::tempdir().unwrap();
        let clock: Arc<dyn TimeSource> = Arc::new(FixedClock(FIXED_TIME));
        let path = generate(Scenario::Two, dir.path(), clock.clone()).unwrap();
        let first = fs::read(&path).unwrap();
        generate(Scenario::Two, dir.path(), clock).unwrap();
        assert_eq!(fs::read(&path).unwrap(), first, "rerun must replace, not append");
        assert_eq!(read_all(&path).unwrap().len(), 3);
    }
}
