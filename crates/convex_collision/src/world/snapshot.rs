//! Serializable view of a [`CollisionWorld`] for debugging and tooling

use super::{CollisionWorld, ShapeKey};
use crate::collision::gjk::{SolverStats, Termination};
use crate::collision::shape::ShapeKind;
use crate::collision::ObjectId;
use crate::pool::LinkId;
use serde::{Deserialize, Serialize};

/// One shape with the contents of its lists
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShapeSnapshot {
    /// Shape handle
    pub key: ShapeKey,
    /// Owning game object
    pub object: ObjectId,
    /// Shape variant
    pub kind: ShapeKind,
    /// Shape whose registered set holds this one
    pub owner: Option<ShapeKey>,
    /// Shapes this one owns
    pub registered: Vec<ShapeKey>,
    /// Candidates in the working list, newest first
    pub working: Vec<ShapeKey>,
    /// Shapes whose working list contains this one
    pub references: Vec<ShapeKey>,
    /// Collision states this shape takes part in, as A then as B
    pub states: Vec<LinkId>,
}

/// One collision state as of its last query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateSnapshot {
    /// State handle
    pub link: LinkId,
    /// Participant A
    pub a: ShapeKey,
    /// Participant B
    pub b: ShapeKey,
    /// Last distance estimate
    pub distance: f32,
    /// How the last query ended, if one ran
    pub termination: Option<Termination>,
    /// Iterations spent by the last query
    pub iterations: u32,
}

/// Every shape and state of a world at one instant
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorldSnapshot {
    /// Live shapes
    pub shapes: Vec<ShapeSnapshot>,
    /// Live collision states
    pub states: Vec<StateSnapshot>,
    /// Solver counters over live and destroyed states
    pub stats: SolverStats,
}

impl WorldSnapshot {
    /// Pretty-printed RON
    pub fn to_ron(&self) -> Result<String, ron::Error> {
        ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
    }
}

impl CollisionWorld {
    /// Capture the current lists and solver state
    pub fn snapshot(&self) -> WorldSnapshot {
        let shapes = self
            .shapes
            .iter()
            .map(|(key, record)| ShapeSnapshot {
                key,
                object: record.object(),
                kind: record.shape().kind(),
                owner: record.owner(),
                registered: record.registered().to_vec(),
                working: self.working.forward(key).map(|(_, other, _)| other).collect(),
                references: self.working.mirror(key).map(|(_, other, _)| other).collect(),
                states: self
                    .states
                    .forward(key)
                    .chain(self.states.mirror(key))
                    .map(|(link, _, _)| link)
                    .collect(),
            })
            .collect();
        let states = self
            .states
            .iter()
            .map(|(link, a, b, state)| StateSnapshot {
                link,
                a,
                b,
                distance: state.distance_estimate(),
                termination: state.termination(),
                iterations: state.iterations(),
            })
            .collect();
        WorldSnapshot {
            shapes,
            states,
            stats: self.solver_stats(),
        }
    }
}
