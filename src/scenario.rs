//! The scenario text format.
//!
//! ```text
//! D I S V F
//! start end name length      (S lines, one per street)
//! P name_1 name_2 ... name_P  (V lines, one per vehicle route)
//! ```
//!
//! `D` is the number of ticks to simulate, `I` the number of intersections,
//! `S` the number of streets, `V` the number of vehicles and `F` the points
//! earned by each vehicle that finishes its route.

use crate::{Error, IntersectionId, Result, Street};
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::str::{FromStr, SplitWhitespace};

/// The intersections one street away from each intersection, in either direction.
pub type Adjacency = BTreeMap<IntersectionId, Vec<IntersectionId>>;

/// A road network and the routes driven over it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scenario {
    /// The number of ticks to simulate.
    pub duration: usize,
    /// The number of intersections; IDs run from zero up to this value.
    pub intersections: usize,
    /// The streets in the order they were declared.
    pub streets: Vec<Street>,
    /// The streets each vehicle will drive along, in order.
    pub routes: Vec<Vec<String>>,
    /// The points earned by each vehicle that finishes its route.
    pub bonus: u64,
}

/// The whitespace separated fields of one line.
struct Fields<'a> {
    line: usize,
    tokens: SplitWhitespace<'a>,
}

impl<'a> Fields<'a> {
    fn new(line: usize, text: &'a str) -> Self {
        Self {
            line,
            tokens: text.split_whitespace(),
        }
    }

    fn error(&self, message: impl Into<String>) -> Error {
        Error::Parse {
            line: self.line,
            message: message.into(),
        }
    }

    fn next_str(&mut self, what: &str) -> Result<&'a str> {
        let line = self.line;
        self.tokens.next().ok_or_else(|| Error::Parse {
            line,
            message: format!("missing {}", what),
        })
    }

    fn next<T: FromStr>(&mut self, what: &str) -> Result<T> {
        let token = self.next_str(what)?;
        token
            .parse()
            .map_err(|_| self.error(format!("invalid {} `{}`", what, token)))
    }

    fn finish(mut self) -> Result<()> {
        match self.tokens.next() {
            Some(token) => Err(self.error(format!("unexpected `{}`", token))),
            None => Ok(()),
        }
    }
}

impl Scenario {
    /// Parses a scenario from its text form.
    pub fn parse(text: &str) -> Result<Self> {
        let mut lines = text
            .lines()
            .enumerate()
            .map(|(idx, line)| Fields::new(idx + 1, line))
            .filter(|fields| fields.tokens.clone().next().is_some());

        let mut header = lines.next().ok_or(Error::Parse {
            line: 1,
            message: "missing header".into(),
        })?;
        let duration = header.next("duration")?;
        let intersections: usize = header.next("intersection count")?;
        let num_streets: usize = header.next("street count")?;
        let num_vehicles: usize = header.next("vehicle count")?;
        let bonus = header.next("bonus")?;
        header.finish()?;

        let mut streets = Vec::with_capacity(num_streets);
        for _ in 0..num_streets {
            let mut fields = lines.next().ok_or_else(|| Error::Parse {
                line: text.lines().count(),
                message: format!("expected {} streets, found {}", num_streets, streets.len()),
            })?;
            let start: usize = fields.next("start intersection")?;
            let end: usize = fields.next("end intersection")?;
            if start >= intersections || end >= intersections {
                return Err(fields.error(format!(
                    "intersection out of range (only {} intersections)",
                    intersections
                )));
            }
            let name = fields.next_str("street name")?.to_owned();
            let length = fields.next("street length")?;
            fields.finish()?;
            streets.push(Street::new(name, start, end, length));
        }

        let mut routes = Vec::with_capacity(num_vehicles);
        for mut fields in lines.by_ref().take(num_vehicles) {
            let hops: usize = fields.next("hop count")?;
            let route = (0..hops)
                .map(|_| fields.next_str("street name").map(str::to_owned))
                .collect::<Result<Vec<_>>>()?;
            fields.finish()?;
            routes.push(route);
        }
        if routes.len() < num_vehicles {
            return Err(Error::Parse {
                line: text.lines().count(),
                message: format!("expected {} routes, found {}", num_vehicles, routes.len()),
            });
        }
        if let Some(extra) = lines.next() {
            return Err(extra.error("unexpected line after the last route"));
        }

        Ok(Self {
            duration,
            intersections,
            streets,
            routes,
            bonus,
        })
    }

    /// Reads and parses a scenario file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::parse(&text)
    }

    /// Formats the scenario as text, the inverse of [Scenario::parse].
    pub fn to_text(&self) -> String {
        let header = format!(
            "{} {} {} {} {}",
            self.duration,
            self.intersections,
            self.streets.len(),
            self.routes.len(),
            self.bonus
        );
        let streets = self.streets.iter().map(|street| {
            format!(
                "{} {} {} {}",
                street.start, street.end, street.name, street.length
            )
        });
        let routes = self
            .routes
            .iter()
            .map(|route| format!("{} {}", route.len(), route.join(" ")));
        let mut out = std::iter::once(header).chain(streets).chain(routes).join("\n");
        out.push('\n');
        out
    }

    /// Writes the scenario to a file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        std::fs::write(path, self.to_text())?;
        Ok(())
    }

    /// Builds the undirected intersection graph used for spatial crossover.
    pub fn adjacency(&self) -> Adjacency {
        let mut sets: BTreeMap<IntersectionId, BTreeSet<IntersectionId>> = BTreeMap::new();
        for street in &self.streets {
            sets.entry(street.start).or_default();
            sets.entry(street.end).or_default();
            if street.start != street.end {
                sets.entry(street.start).or_default().insert(street.end);
                sets.entry(street.end).or_default().insert(street.start);
            }
        }
        sets.into_iter()
            .map(|(id, set)| (id, set.into_iter().collect()))
            .collect()
    }
}
