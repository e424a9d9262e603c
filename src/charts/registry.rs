//! Chart Registry
//!
//! Owns at most one live chart per panel id. Rendering into a panel
//! always tears down the previous chart for that id first.

use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Mutex;

use super::ChartConfig;

/// A live chart bound to a panel's canvas
pub trait ChartHandle: Send + Sync {
    /// Release the rendering context
    fn destroy(&mut self);
}

/// The drawing layer charts are created on
pub trait ChartSurface: Send + Sync {
    fn create(
        &self,
        panel_id: &str,
        config: &ChartConfig,
    ) -> Result<Box<dyn ChartHandle>, ChartError>;
}

/// Errors raised while creating a chart
#[derive(Error, Debug)]
pub enum ChartError {
    /// The panel's canvas is not mounted
    #[error("Canvas not found: {0}")]
    MissingCanvas(String),

    #[error("Invalid chart spec: {0}")]
    InvalidSpec(String),
}

/// Registry shared by the dashboard, chat and bootstrap
pub type SharedCharts = Arc<Mutex<ChartRegistry>>;

/// Panel id -> live chart
pub struct ChartRegistry {
    surface: Arc<dyn ChartSurface>,
    charts: HashMap<String, Box<dyn ChartHandle>>,
}

impl ChartRegistry {
    pub fn new(surface: Arc<dyn ChartSurface>) -> Self {
        Self {
            surface,
            charts: HashMap::new(),
        }
    }

    pub fn shared(surface: Arc<dyn ChartSurface>) -> SharedCharts {
        Arc::new(Mutex::new(Self::new(surface)))
    }

    /// Replace whatever chart `panel_id` holds with a new one.
    ///
    /// The old chart is destroyed even if creating the new one fails, so
    /// a failed render leaves the panel empty rather than stale.
    pub fn render(&mut self, panel_id: &str, config: &ChartConfig) -> Result<(), ChartError> {
        self.destroy(panel_id);

        let handle = self.surface.create(panel_id, config)?;
        self.charts.insert(panel_id.to_string(), handle);

        tracing::debug!(panel = %panel_id, kind = ?config.kind, points = config.len(), "Chart rendered");
        Ok(())
    }

    /// Destroy the chart registered under `panel_id`, if any
    pub fn destroy(&mut self, panel_id: &str) -> bool {
        match self.charts.remove(panel_id) {
            Some(mut handle) => {
                handle.destroy();
                true
            }
            None => false,
        }
    }

    /// Tear down every registered chart
    pub fn destroy_all(&mut self) {
        let count = self.charts.len();
        for (_, mut handle) in self.charts.drain() {
            handle.destroy();
        }
        tracing::debug!(count, "All charts destroyed");
    }

    pub fn contains(&self, panel_id: &str) -> bool {
        self.charts.contains_key(panel_id)
    }

    /// Number of live charts
    pub fn len(&self) -> usize {
        self.charts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.charts.is_empty()
    }

    pub fn panel_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.charts.keys().cloned().collect();
        ids.sort();
        ids
    }
}


#[cfg(test)]
mod tests {
    use super::testing::CountingSurface;
    use super::*;
    use crate::api::StateRanking;

    fn config() -> ChartConfig {
        ChartConfig::state_ranking(&[StateRanking {
            state: "Kerala".to_string(),
            bio_ratio: 12.0,
            enrollments: None,
            bio_updates: None,
        }])
    }

    #[test]
    fn test_render_twice_keeps_one_instance() {
        let surface = Arc::new(CountingSurface::default());
        let mut registry = ChartRegistry::new(surface.clone());

        registry.render("statesChart", &config()).unwrap();
        registry.render("statesChart", &config()).unwrap();

        assert_eq!(registry.len(), 1);
        assert_eq!(surface.live(), 1);
        assert_eq!(surface.created_for("statesChart").len(), 2);
    }

    #[test]
    fn test_panels_are_independent() {
        let surface = Arc::new(CountingSurface::default());
        let mut registry = ChartRegistry::new(surface.clone());

        registry.render("statesChart", &config()).unwrap();
        registry.render("crisisChart", &config()).unwrap();

        assert_eq!(registry.panel_ids(), vec!["crisisChart", "statesChart"]);
        assert_eq!(surface.live(), 2);

        assert!(registry.destroy("statesChart"));
        assert!(!registry.destroy("statesChart"));
        assert_eq!(surface.live(), 1);
    }

    #[test]
    fn test_failed_render_clears_panel() {
        let surface = Arc::new(CountingSurface::default());
        let mut registry = ChartRegistry::new(surface.clone());

        registry.render("statesChart", &config()).unwrap();
        surface.unmount("statesChart");

        let err = registry.render("statesChart", &config()).unwrap_err();
        assert!(matches!(err, ChartError::MissingCanvas(_)));
        assert!(!registry.contains("statesChart"));
        assert_eq!(surface.live(), 0);
    }

    #[test]
    fn test_destroy_all() {
        let surface = Arc::new(CountingSurface::default());
        let mut registry = ChartRegistry::new(surface.clone());

        for id in ["a", "b", "c"] {
            registry.render(id, &config()).unwrap();
        }
        registry.destroy_all();

        assert!(registry.is_empty());
        assert_eq!(surface.live(), 0);
    }
}
