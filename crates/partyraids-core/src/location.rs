//! Coordinate value types.
//!
//! Both [`Point`] and [`WorldLocation`] compare and hash on their canonical
//! two-decimal string form, so coordinates that differ only below that
//! precision are considered the same place.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;
use std::sync::Arc;

use crate::error::RaidsError;
use crate::host::{Server, World};

/// An immutable `(x, y, z)` coordinate inside a world.
#[derive(Debug, Clone, Copy)]
pub struct Point {
    x: f64,
    y: f64,
    z: f64,
}

impl Point {
    /// The world origin.
    pub const ORIGIN: Self = Self::new(0.0, 0.0, 0.0);

    /// Creates a point from its components.
    #[must_use]
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Returns the x component.
    #[must_use]
    pub fn x(&self) -> f64 {
        self.x
    }

    /// Returns the y component.
    #[must_use]
    pub fn y(&self) -> f64 {
        self.y
    }

    /// Returns the z component.
    #[must_use]
    pub fn z(&self) -> f64 {
        self.z
    }

    /// Parses `"x,y,z"`, tolerating whitespace around each component.
    ///
    /// # Errors
    ///
    /// Returns `RaidsError::Format` unless the input has exactly three
    /// finite numeric components.
    pub fn parse(input: &str) -> Result<Self, RaidsError> {
        let parts: Vec<&str> = input.split(',').map(str::trim).collect();
        let [x, y, z] = parts.as_slice() else {
            return Err(RaidsError::Format(format!(
                "expected \"x,y,z\" but found \"{input}\""
            )));
        };

        Ok(Self::new(
            parse_component(x, input)?,
            parse_component(y, input)?,
            parse_component(z, input)?,
        ))
    }
}

fn parse_component(component: &str, input: &str) -> Result<f64, RaidsError> {
    component
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
        .ok_or_else(|| {
            RaidsError::Format(format!("invalid coordinate \"{component}\" in \"{input}\""))
        })
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2},{:.2},{:.2}", self.x, self.y, self.z)
    }
}

impl FromStr for Point {
    type Err = RaidsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl PartialEq for Point {
    fn eq(&self, other: &Self) -> bool {
        self.to_string() == other.to_string()
    }
}

impl Eq for Point {}

impl Hash for Point {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.to_string().hash(state);
    }
}

/// A point bound to a live world handle.
#[derive(Clone)]
pub struct WorldLocation {
    world: Arc<dyn World>,
    point: Point,
}

impl WorldLocation {
    /// Creates a location in `world`.
    #[must_use]
    pub fn new(world: Arc<dyn World>, point: Point) -> Self {
        Self { world, point }
    }

    /// Parses `"worldName:x,y,z"`, resolving the world against `server`.
    ///
    /// # Errors
    ///
    /// Returns `RaidsError::Format` for malformed input and
    /// `RaidsError::NotFound` if the named world is not loaded.
    pub fn parse(input: &str, server: &dyn Server) -> Result<Self, RaidsError> {
        let parts: Vec<&str> = input.split(':').collect();
        let [world_name, point] = parts.as_slice() else {
            return Err(RaidsError::Format(format!(
                "expected \"world:x,y,z\" but found \"{input}\""
            )));
        };

        let point = Point::parse(point)?;
        let world = server
            .world(world_name)
            .ok_or_else(|| RaidsError::NotFound(format!("world {world_name}")))?;

        Ok(Self::new(world, point))
    }

    /// Returns the world handle.
    #[must_use]
    pub fn world(&self) -> &Arc<dyn World> {
        &self.world
    }

    /// Returns the name of the world.
    #[must_use]
    pub fn world_name(&self) -> String {
        self.world.name()
    }

    /// Returns the coordinate.
    #[must_use]
    pub fn point(&self) -> Point {
        self.point
    }
}

impl fmt::Display for WorldLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.world.name(), self.point)
    }
}

impl fmt::Debug for WorldLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("WorldLocation")
            .field(&self.to_string())
            .finish()
    }
}

impl PartialEq for WorldLocation {
    fn eq(&self, other: &Self) -> bool {
        self.to_string() == other.to_string()
    }
}

impl Eq for WorldLocation {}

impl Hash for WorldLocation {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.to_string().hash(state);
    }
}
