//! Layout strategies and the registry that selects one per diagram type.
//!
//! The registry is built once through [`StrategyRegistryBuilder`] and
//! validated on [`build`](StrategyRegistryBuilder::build): every
//! [`DiagramType`] must be supported by exactly one registered strategy.
//! Lookups afterwards cannot fail for a known diagram type.

mod cycle;
pub(crate) mod grid;
mod hierarchical;
mod matrix;
mod timeline;

use std::{any::Any, collections::HashMap, fmt};

use log::debug;

use narragraph_core::analysis::DiagramType;

use crate::{
    config::LayoutConfig,
    error::{ConfigError, LayoutError},
    layout::{LayoutGraph, Placement},
};

pub use cycle::CycleStrategy;
pub use hierarchical::HierarchicalStrategy;
pub use matrix::MatrixStrategy;
pub use timeline::TimelineStrategy;

/// A layout algorithm for one or more diagram types
pub trait LayoutStrategy: Send + Sync {
    /// Unique name, used in logs and degradation reasons
    fn name(&self) -> &str;

    fn supports(&self, diagram_type: DiagramType) -> bool;

    /// Place every node of `graph`.
    ///
    /// Positions are top-left corners in any coordinate space; the engine
    /// normalizes them afterwards. The placement must not overlap.
    ///
    /// # Errors
    /// Returns [`LayoutError::Strategy`] when the algorithm cannot place the graph.
    fn generate(&self, graph: &LayoutGraph, config: &LayoutConfig)
    -> Result<Placement, LayoutError>;
}

/// Builder for a validated [`StrategyRegistry`]
#[derive(Default)]
pub struct StrategyRegistryBuilder {
    strategies: Vec<Box<dyn LayoutStrategy>>,
}

impl StrategyRegistryBuilder {
    pub fn register(mut self, strategy: impl LayoutStrategy + 'static) -> Self {
        self.strategies.push(Box::new(strategy));
        self
    }

    /// Validate the registrations and build the registry.
    ///
    /// # Errors
    /// - [`ConfigError::DuplicateStrategy`] if two strategies share a name
    /// - [`ConfigError::NoStrategy`] if a diagram type is unsupported
    /// - [`ConfigError::AmbiguousStrategy`] if a diagram type has several strategies
    pub fn build(self) -> Result<StrategyRegistry, ConfigError> {
        for (idx, strategy) in self.strategies.iter().enumerate() {
            if self.strategies[..idx]
                .iter()
                .any(|other| other.name() == strategy.name())
            {
                return Err(ConfigError::DuplicateStrategy(strategy.name().to_string()));
            }
        }

        let mut by_type = HashMap::with_capacity(DiagramType::ALL.len());
        for diagram_type in DiagramType::ALL {
            let supporting: Vec<usize> = self
                .strategies
                .iter()
                .enumerate()
                .filter(|(_, strategy)| strategy.supports(diagram_type))
                .map(|(idx, _)| idx)
                .collect();

            match supporting.as_slice() {
                [] => return Err(ConfigError::NoStrategy(diagram_type)),
                [idx] => {
                    by_type.insert(diagram_type, *idx);
                }
                many => {
                    return Err(ConfigError::AmbiguousStrategy {
                        diagram_type,
                        strategies: many
                            .iter()
                            .map(|&idx| self.strategies[idx].name().to_string())
                            .collect(),
                    });
                }
            }
        }

        debug!(strategies = self.strategies.len(); "Built layout strategy registry");
        Ok(StrategyRegistry {
            strategies: self.strategies,
            by_type,
        })
    }
}

/// Exactly one strategy per diagram type
pub struct StrategyRegistry {
    strategies: Vec<Box<dyn LayoutStrategy>>,
    by_type: HashMap<DiagramType, usize>,
}

impl StrategyRegistry {
    pub fn builder() -> StrategyRegistryBuilder {
        StrategyRegistryBuilder::default()
    }

    /// Registry with the built-in strategies
    ///
    /// # Errors
    /// Propagates the validation errors of [`StrategyRegistryBuilder::build`].
    pub fn standard() -> Result<Self, ConfigError> {
        Self::builder()
            .register(HierarchicalStrategy)
            .register(TimelineStrategy)
            .register(MatrixStrategy)
            .register(CycleStrategy)
            .build()
    }

    pub fn strategy_for(&self, diagram_type: DiagramType) -> Option<&dyn LayoutStrategy> {
        self.by_type
            .get(&diagram_type)
            .map(|&idx| self.strategies[idx].as_ref())
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.strategies.iter().map(|strategy| strategy.name())
    }
}

impl fmt::Debug for StrategyRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}

/// Text of a caught panic payload
pub(crate) fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else {
        "unknown panic".to_string()
    }
}
