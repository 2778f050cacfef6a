//! The lifecycle walkthrough.

use anyhow::{Result, ensure};
use serde_json::{Value, json};
use tracing::info;

use dnd_abstract::{DragDropManager, Entity, EntityInput, ManagerConfig, UniqueIdentifier};

/// Parameters of one walkthrough.
#[derive(Debug, Clone)]
pub struct Scenario {
    pub id: String,
    pub rename_to: String,
    pub label: String,
}

/// Registry contents observed after one step.
#[derive(Debug, Clone)]
pub struct Step {
    pub name: &'static str,
    pub registered: Vec<String>,
}

/// Everything the walkthrough observed, in order.
#[derive(Debug, Default)]
pub struct Report {
    pub steps: Vec<Step>,
}

impl Scenario {
    /// Construct, flush, rename and destroy one entity, checking the registry
    /// after each step.
    ///
    /// # Errors
    ///
    /// Returns an error if a registry operation fails or the registry does
    /// not hold what the step expects.
    pub fn run(&self, config: ManagerConfig) -> Result<Report> {
        let manager: std::rc::Rc<DragDropManager<Value>> = DragDropManager::new(config);
        let original = UniqueIdentifier::from(self.id.as_str());
        let renamed = UniqueIdentifier::from(self.rename_to.as_str());
        let mut report = Report::default();

        let entity = Entity::new(
            EntityInput::new(original.clone()).with_data(json!({ "label": self.label })),
            &manager,
        );
        ensure!(entity.id() == original, "identifier not visible after construction");
        ensure!(
            !manager.registry().contains(&original),
            "registered before the deferred tier ran"
        );
        report.record("constructed", &manager);

        let ran = manager.flush()?;
        info!(tasks = ran, "deferred tier drained");
        ensure!(
            manager.registry().contains(&original),
            "not registered after the deferred tier ran"
        );
        report.record("registered", &manager);

        entity.set_id(renamed.clone())?;
        if renamed != original {
            ensure!(
                !manager.registry().contains(&original),
                "old identifier still registered"
            );
        }
        ensure!(
            manager.registry().contains(&renamed),
            "new identifier not registered"
        );
        report.record("renamed", &manager);

        entity.destroy();
        ensure!(manager.registry().is_empty(), "registry not empty after destroy");
        report.record("destroyed", &manager);

        Ok(report)
    }
}

impl Report {
    fn record(&mut self, name: &'static str, manager: &DragDropManager<Value>) {
        let mut registered: Vec<String> = manager
            .registry()
            .ids()
            .iter()
            .map(ToString::to_string)
            .collect();
        registered.sort();
        self.steps.push(Step { name, registered });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dnd_abstract::DuplicatePolicy;

    fn scenario(id: &str, rename_to: &str) -> Scenario {
        Scenario {
            id: id.to_string(),
            rename_to: rename_to.to_string(),
            label: "foo".to_string(),
        }
    }

    #[test]
    fn test_walkthrough_steps() {
        let report = scenario("x1", "x2").run(ManagerConfig::default()).unwrap();
        let observed: Vec<_> = report
            .steps
            .iter()
            .map(|step| (step.name, step.registered.clone()))
            .collect();
        assert_eq!(
            observed,
            vec![
                ("constructed", vec![]),
                ("registered", vec!["x1".to_string()]),
                ("renamed", vec!["x2".to_string()]),
                ("destroyed", vec![]),
            ]
        );
    }

    #[test]
    fn test_rename_to_same_identifier() {
        let config = ManagerConfig::new().with_duplicate_policy(DuplicatePolicy::Reject);
        let report = scenario("x1", "x1").run(config).unwrap();
        assert_eq!(report.steps[2].registered, vec!["x1".to_string()]);
    }
}
