//! Bracketed command interpreter
//!
//! Commands have the form `Name[key=value;key=value]`, with tuples written as
//! `(x,y,z)`. Leading whitespace is ignored so the output of `print[]` can be fed
//! back line by line. Blank lines and lines starting with `#` do nothing.
//!
//! | Command | Effect |
//! |---|---|
//! | `FireDomain[sw=(x,y,z);ne=(x,y,z);t=T;date=D]` | define the domain (`date` optional) |
//! | `FireFront[id=I;domain=D;t=T;closed=B]` | create an empty front (closed unless `closed=false`) |
//! | `FireNode[loc=(x,y,z);vel=(u,v,w);t=T;depth=D;state=S;frontId=I]` | append a node |
//! | `startFire[loc=(x,y,z);t=T]` | point ignition |
//! | `goTo[t=T]` | advance the clock |
//! | `print[]` | render the current state |
//! | `setParameter[key=value]` | set one or more parameters |

use super::context::Simulation;
use super::render;
use crate::core_types::{ReferenceTime, Vec2, Vec3};
use crate::error::{FireError, Result};
use crate::front::{FrontId, NodeState};
use rustc_hash::FxHashMap;
use tracing::debug;

/// A parsed command line
#[derive(Debug, Clone, PartialEq)]
pub struct Command<'a> {
    pub name: &'a str,
    pub args: FxHashMap<&'a str, &'a str>,
}

impl<'a> Command<'a> {
    /// Split `Name[k=v;...]` into its name and arguments
    pub fn parse(line: &'a str) -> Result<Self> {
        let line = line.trim();
        let open = line
            .find('[')
            .ok_or_else(|| FireError::command(format!("missing '[' in '{line}'")))?;
        if !line.ends_with(']') {
            return Err(FireError::command(format!("missing closing ']' in '{line}'")));
        }
        let name = line[..open].trim();
        if name.is_empty() {
            return Err(FireError::command(format!("missing command name in '{line}'")));
        }
        let body = &line[open + 1..line.len() - 1];
        let mut args = FxHashMap::default();
        for pair in body.split(';').map(str::trim).filter(|p| !p.is_empty()) {
            let (key, value) = pair
                .split_once('=')
                .ok_or_else(|| FireError::command(format!("argument '{pair}' is not key=value")))?;
            args.insert(key.trim(), value.trim());
        }
        Ok(Self { name, args })
    }

    fn raw(&self, key: &str) -> Result<&'a str> {
        self.args
            .get(key)
            .copied()
            .ok_or_else(|| FireError::command(format!("{}: missing '{key}'", self.name)))
    }

    fn number(&self, key: &str) -> Result<f64> {
        let raw = self.raw(key)?;
        raw.parse()
            .map_err(|_| FireError::command(format!("{}: '{key}={raw}' is not a number", self.name)))
    }

    fn number_or(&self, key: &str, fallback: f64) -> Result<f64> {
        if self.args.contains_key(key) {
            self.number(key)
        } else {
            Ok(fallback)
        }
    }

    fn point(&self, key: &str) -> Result<Vec3> {
        parse_tuple(self.raw(key)?)
            .map_err(|err| FireError::command(format!("{}: '{key}': {err}", self.name)))
    }

    fn id(&self, key: &str) -> Result<Option<FrontId>> {
        self.args
            .get(key)
            .map(|raw| {
                raw.parse::<FrontId>().map_err(|_| {
                    FireError::command(format!("{}: '{key}={raw}' is not an id", self.name))
                })
            })
            .transpose()
    }
}

/// Parse `(x,y)` or `(x,y,z)`
fn parse_tuple(raw: &str) -> std::result::Result<Vec3, String> {
    let inner = raw
        .trim()
        .strip_prefix('(')
        .and_then(|s| s.strip_suffix(')'))
        .ok_or_else(|| format!("expected a tuple, got '{raw}'"))?;
    let values = inner
        .split(',')
        .map(|v| v.trim().parse::<f64>().map_err(|_| format!("bad coordinate '{v}'")))
        .collect::<std::result::Result<Vec<f64>, String>>()?;
    match values.as_slice() {
        [x, y] => Ok(Vec3::new(*x, *y, 0.0)),
        [x, y, z] => Ok(Vec3::new(*x, *y, *z)),
        _ => Err(format!("expected 2 or 3 coordinates, got {}", values.len())),
    }
}

/// Execute one line against `sim`, returning its textual output
pub fn execute(sim: &mut Simulation, line: &str) -> Result<String> {
    let trimmed = line.trim();
    if trimmed.is_empty() || trimmed.starts_with('#') {
        return Ok(String::new());
    }
    let cmd = Command::parse(trimmed)?;
    debug!("Executing {}", cmd.name);
    match cmd.name {
        "FireDomain" => {
            let sw = cmd.point("sw")?;
            let ne = cmd.point("ne")?;
            let t = cmd.number_or("t", 0.0)?;
            let reference = match cmd.args.get("date") {
                Some(raw) => raw.parse::<ReferenceTime>()?,
                None => ReferenceTime::default(),
            };
            sim.create_domain_at(Vec2::new(sw.x, sw.y), Vec2::new(ne.x, ne.y), t, reference)?;
        }
        "FireFront" => {
            let t = cmd.number_or("t", sim.time())?;
            let id = sim.create_front(cmd.id("id")?, t)?;
            if let Some(raw) = cmd.args.get("closed") {
                let closed = match *raw {
                    "true" | "1" => true,
                    "false" | "0" => false,
                    other => {
                        return Err(FireError::command(format!(
                            "FireFront: closed must be true or false, got '{other}'"
                        )))
                    }
                };
                sim.set_front_closed(id, closed)?;
            }
        }
        "FireNode" => {
            let front = match cmd.id("frontId")? {
                Some(id) => id,
                None => sim
                    .current_front
                    .ok_or_else(|| FireError::command("FireNode: no front to attach to"))?,
            };
            let loc = cmd.point("loc")?;
            let vel = match cmd.args.get("vel") {
                Some(_) => cmd.point("vel")?,
                None => Vec3::zeros(),
            };
            let t = cmd.number_or("t", sim.time())?;
            let state = match cmd.args.get("state") {
                Some(raw) => raw.parse::<NodeState>()?,
                None => NodeState::Init,
            };
            match cmd.args.get("depth") {
                Some(_) => {
                    let depth = cmd.number("depth")?;
                    sim.add_node_with_depth(front, loc, vel, t, state, depth)?;
                }
                None => {
                    sim.add_node(front, loc, vel, t, state)?;
                }
            }
        }
        "startFire" => {
            let loc = cmd.point("loc")?;
            let t = cmd.number_or("t", sim.time())?;
            sim.ignite_point(Vec2::new(loc.x, loc.y), t)?;
        }
        "goTo" => {
            let t = cmd.number("t")?;
            sim.advance_to(t)?;
        }
        "print" => return Ok(render::render(sim)),
        "setParameter" | "setParameters" => {
            if cmd.args.is_empty() {
                return Err(FireError::command("setParameter: nothing to set"));
            }
            let mut pairs: Vec<(&str, &str)> = cmd.args.iter().map(|(k, v)| (*k, *v)).collect();
            pairs.sort_unstable();
            for (key, value) in pairs {
                sim.set_parameter(key, value)?;
            }
        }
        other => return Err(FireError::command(format!("unknown command '{other}'"))),
    }
    Ok(String::new())
}

/// Execute a multi-line script, concatenating the outputs
pub fn execute_script(sim: &mut Simulation, script: &str) -> Result<String> {
    let mut out = String::new();
    for line in script.lines() {
        out.push_str(&execute(sim, line)?);
    }
    Ok(out)
}
