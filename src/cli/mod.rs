pub mod catalog;
pub mod dataset;
pub mod invariants;
pub mod predict;
pub mod search;
pub mod train;

use std::path::Path;
use std::process;

use knotgen::braid::catalog as braid_catalog;
use knotgen::{Braid, Config, Error};

/// Print an error, with a source excerpt when it carries a span, and exit.
pub fn fail(err: Error, origin: &str, source: &str) -> ! {
    match err.diagnostic() {
        Some(diag) => diag.render(origin, source),
        None => eprintln!("error: {}", err),
    }
    process::exit(1);
}

pub fn load_config(path: Option<&Path>) -> Config {
    match Config::discover(path) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("error: {}", e);
            process::exit(1);
        }
    }
}

/// The name of a catalogue entry, or a braid word.
pub fn resolve_braid(text: &str) -> Braid {
    match braid_catalog::resolve(text) {
        Ok(b) => b,
        Err(diag) => fail(Error::Parse(diag), "<braid>", text),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalogue_aliases_are_not_read_as_letters() {
        let trefoil = resolve_braid("trefoil");
        assert_eq!((trefoil.strands(), trefoil.signed_word()), (2, vec![1, 1, 1]));
        assert_eq!(resolve_braid("Hopf link").component_count(), 2);
        assert_eq!(resolve_braid("4_1"), resolve_braid("1 -2 1 -2"));
        assert_eq!(resolve_braid("aBaB"), resolve_braid("4_1"));
    }
}
