//! ControllerBuilder - wiring ports into an `AutomationController`.
//!
//! # Fail-fast 設計
//! - 3 つの port (capture / perception / actuation) は必須
//! - build() 時に不足 port と config の不正をまとめて検出する

use std::sync::Arc;

use crate::app::config::{AutomationConfig, ConfigError, LoopTiming};
use crate::app::controller::AutomationController;
use crate::ports::{
    ActuationPort, CapturePort, Clock, PerceptionPort, SessionIdGenerator, SystemClock,
    UlidGenerator,
};

#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("Missing ports: {0:?}. These ports must be provided before build().")]
    MissingPorts(Vec<&'static str>),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// # 使用例
/// ```ignore
/// let device = Arc::new(SimulatedDevice::new(SimulationScript::default()));
/// let controller = ControllerBuilder::new()
///     .capture(device.clone())
///     .perception(device.clone())
///     .actuation(device)
///     .config(AutomationConfig::default())
///     .build()?;
/// ```
#[derive(Default)]
pub struct ControllerBuilder {
    capture: Option<Arc<dyn CapturePort>>,
    perception: Option<Arc<dyn PerceptionPort>>,
    actuation: Option<Arc<dyn ActuationPort>>,
    clock: Option<Arc<dyn Clock>>,
    id_generator: Option<Arc<dyn SessionIdGenerator>>,
    config: AutomationConfig,
    timing: LoopTiming,
}

impl ControllerBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn capture(mut self, port: Arc<dyn CapturePort>) -> Self {
        self.capture = Some(port);
        self
    }

    pub fn perception(mut self, port: Arc<dyn PerceptionPort>) -> Self {
        self.perception = Some(port);
        self
    }

    pub fn actuation(mut self, port: Arc<dyn ActuationPort>) -> Self {
        self.actuation = Some(port);
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Defaults to a `UlidGenerator` on the builder's clock.
    pub fn id_generator(mut self, id_generator: Arc<dyn SessionIdGenerator>) -> Self {
        self.id_generator = Some(id_generator);
        self
    }

    pub fn config(mut self, config: AutomationConfig) -> Self {
        self.config = config;
        self
    }

    pub fn timing(mut self, timing: LoopTiming) -> Self {
        self.timing = timing;
        self
    }

    pub fn build(self) -> Result<AutomationController, BuildError> {
        let mut missing = Vec::new();
        if self.capture.is_none() {
            missing.push("capture");
        }
        if self.perception.is_none() {
            missing.push("perception");
        }
        if self.actuation.is_none() {
            missing.push("actuation");
        }
        let (Some(capture), Some(perception), Some(actuation)) =
            (self.capture, self.perception, self.actuation)
        else {
            return Err(BuildError::MissingPorts(missing));
        };

        self.config.validate()?;

        let clock = self.clock.unwrap_or_else(|| Arc::new(SystemClock));
        let id_generator = self
            .id_generator
            .unwrap_or_else(|| Arc::new(UlidGenerator::new(Arc::clone(&clock))));

        Ok(AutomationController::new(
            self.config,
            self.timing,
            capture,
            perception,
            actuation,
            clock,
            id_generator,
        ))
    }
}
