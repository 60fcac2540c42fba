//! Strategy selection and engine configuration.

use std::fmt;
use std::str::FromStr;

use crate::strategy::{
    Bipartite, EdgeRanking, FlattenAndColor, Greedy, InOrder, ScheduleError, Scheduler,
};

/// The scheduling strategies the engine implements.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StrategyKind {
    InOrder,
    EdgeRanking,
    FlattenAndColor,
    Bipartite,
    Greedy,
}

impl StrategyKind {
    pub const ALL: [StrategyKind; 5] = [
        StrategyKind::InOrder,
        StrategyKind::EdgeRanking,
        StrategyKind::FlattenAndColor,
        StrategyKind::Bipartite,
        StrategyKind::Greedy,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            StrategyKind::InOrder => "in-order",
            StrategyKind::EdgeRanking => "edge-ranking",
            StrategyKind::FlattenAndColor => "flatten-and-color",
            StrategyKind::Bipartite => "bipartite",
            StrategyKind::Greedy => "greedy",
        }
    }

    /// Instantiate the strategy with the given logging verbosity.
    pub fn build(&self, verbosity: u8) -> Box<dyn Scheduler> {
        match self {
            StrategyKind::InOrder => Box::new(InOrder::new(verbosity)),
            StrategyKind::EdgeRanking => Box::new(EdgeRanking::new(verbosity)),
            StrategyKind::FlattenAndColor => Box::new(FlattenAndColor::new(verbosity)),
            StrategyKind::Bipartite => Box::new(Bipartite::new(verbosity)),
            StrategyKind::Greedy => Box::new(Greedy::new(verbosity)),
        }
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for StrategyKind {
    type Err = ScheduleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|k| k.name() == s)
            .ok_or_else(|| ScheduleError::UnknownStrategy(s.to_string()))
    }
}

/// Engine configuration: which strategy to drive and how loudly.
#[derive(Clone, Debug)]
pub struct ScheduleConfig {
    pub strategy: StrategyKind,
    /// Verbosity for the engine's logging macros (0-3).
    pub verbosity: u8,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            strategy: StrategyKind::InOrder,
            verbosity: 0,
        }
    }
}

impl ScheduleConfig {
    pub fn build(&self) -> Box<dyn Scheduler> {
        self.strategy.build(self.verbosity)
    }
}
