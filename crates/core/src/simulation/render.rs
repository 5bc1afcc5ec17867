//! Textual form of the simulation state
//!
//! Output uses the same bracketed syntax the command interpreter reads:
//!
//! ```text
//! FireDomain[sw=(0,0,0);ne=(100,100,0);t=0]
//! 	FireFront[id=1;domain=0;t=0;closed=true]
//! 		FireNode[domain=0;loc=(53,50,0);vel=(1,0,0);t=0;depth=1;state=moving;frontId=1]
//! ```

use super::context::{FrontSnapshot, Simulation};
use crate::core_types::{ReferenceTime, Vec3};
use std::fmt::Write;

/// Number with up to four decimals and no trailing zeros
fn num(v: f64) -> String {
    if !v.is_finite() {
        return v.to_string();
    }
    let s = format!("{v:.4}");
    let s = s.trim_end_matches('0').trim_end_matches('.');
    if s == "-0" {
        "0".to_string()
    } else {
        s.to_string()
    }
}

fn tuple(v: &Vec3) -> String {
    format!("({},{},{})", num(v.x), num(v.y), num(v.z))
}

/// Render one front and its nodes, indented under a domain line
pub fn render_front(out: &mut String, front: &FrontSnapshot) {
    let _ = writeln!(
        out,
        "\tFireFront[id={};domain={};t={};closed={}]",
        front.id,
        front.domain,
        num(front.time),
        front.closed
    );
    for node in &front.nodes {
        let _ = writeln!(
            out,
            "\t\tFireNode[domain={};loc={};vel={};t={};depth={};state={};frontId={}]",
            front.domain,
            tuple(&node.loc),
            tuple(&node.vel),
            num(node.time),
            num(node.depth),
            node.state,
            front.id
        );
    }
}

/// Render the domain and every active front
pub fn render(sim: &Simulation) -> String {
    let mut out = String::new();
    let Some(domain) = sim.domain() else {
        return out;
    };
    let (sw, ne) = (domain.sw(), domain.ne());
    let _ = write!(
        out,
        "FireDomain[sw=({},{},0);ne=({},{},0);t={}",
        num(sw.x),
        num(sw.y),
        num(ne.x),
        num(ne.y),
        num(sim.time())
    );
    if domain.reference() != ReferenceTime::default() {
        let _ = write!(out, ";date={}", domain.reference());
    }
    out.push_str("]\n");
    for front in sim.fronts() {
        render_front(&mut out, &front);
    }
    out
}
