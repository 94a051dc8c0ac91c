//! Small knots and links with known braid words.
//!
//! Names follow the Rolfsen table for knots and the Thistlethwaite table for
//! links. Words are the minimal braid representatives; chirality is whatever
//! the word gives (all-positive words close to positive knots).

use super::{notation, Braid};
use crate::diagnostic::Diagnostic;
use crate::error::{Error, Result};

/// One catalogue entry.
#[derive(Clone, Copy, Debug)]
pub struct CatalogEntry {
    pub name: &'static str,
    pub strands: usize,
    pub word: &'static [i32],
    pub description: &'static str,
}

impl CatalogEntry {
    pub fn braid(&self) -> Braid {
        // catalogue words are checked by the tests below
        Braid::from_signed(self.strands, self.word).unwrap_or_else(|_| Braid::identity(1))
    }
}

const ENTRIES: &[CatalogEntry] = &[
    CatalogEntry {
        name: "0_1",
        strands: 1,
        word: &[],
        description: "unknot",
    },
    CatalogEntry {
        name: "3_1",
        strands: 2,
        word: &[1, 1, 1],
        description: "trefoil",
    },
    CatalogEntry {
        name: "4_1",
        strands: 3,
        word: &[1, -2, 1, -2],
        description: "figure-eight knot",
    },
    CatalogEntry {
        name: "5_1",
        strands: 2,
        word: &[1, 1, 1, 1, 1],
        description: "cinquefoil, (2,5) torus knot",
    },
    CatalogEntry {
        name: "5_2",
        strands: 3,
        word: &[1, 1, 1, 2, -1, 2],
        description: "three-twist knot",
    },
    CatalogEntry {
        name: "6_1",
        strands: 4,
        word: &[1, 1, 2, -1, -3, 2, -3],
        description: "stevedore knot",
    },
    CatalogEntry {
        name: "6_2",
        strands: 3,
        word: &[1, 1, 1, -2, 1, -2],
        description: "",
    },
    CatalogEntry {
        name: "6_3",
        strands: 3,
        word: &[1, 1, -2, 1, -2, -2],
        description: "",
    },
    CatalogEntry {
        name: "7_1",
        strands: 2,
        word: &[1, 1, 1, 1, 1, 1, 1],
        description: "(2,7) torus knot",
    },
    CatalogEntry {
        name: "L2a1",
        strands: 2,
        word: &[1, 1],
        description: "Hopf link",
    },
    CatalogEntry {
        name: "L4a1",
        strands: 2,
        word: &[1, 1, 1, 1],
        description: "Solomon link, (2,4) torus link",
    },
    CatalogEntry {
        name: "L6a4",
        strands: 3,
        word: &[1, -2, 1, -2, 1, -2],
        description: "Borromean rings",
    },
];

/// All catalogue entries in table order.
pub fn entries() -> &'static [CatalogEntry] {
    ENTRIES
}

/// Find an entry by name; `unknot`, `trefoil`, `hopf` etc. are accepted as
/// aliases through the descriptions.
pub fn find(name: &str) -> Option<&'static CatalogEntry> {
    let lower = name.trim().to_ascii_lowercase();
    ENTRIES.iter().find(|e| {
        e.name.eq_ignore_ascii_case(&lower)
            || (!e.description.is_empty()
                && e.description
                    .split(',')
                    .next()
                    .is_some_and(|d| d.trim().eq_ignore_ascii_case(&lower)))
    })
}

/// A catalogue name or alias, otherwise braid notation. Names go first:
/// letter notation would read `trefoil` as a 21-strand word.
pub fn resolve(text: &str) -> std::result::Result<Braid, Diagnostic> {
    match find(text) {
        Some(entry) => Ok(entry.braid()),
        None => notation::parse_braid(text),
    }
}

/// Braid for a catalogue name.
pub fn lookup(name: &str) -> Result<Braid> {
    find(name)
        .map(|e| e.braid())
        .ok_or_else(|| Error::UnknownKnot(name.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_word_fits_its_strands() {
        for e in entries() {
            assert!(
                Braid::from_signed(e.strands, e.word).is_ok(),
                "{} has an out-of-range generator",
                e.name
            );
        }
    }

    #[test]
    fn knots_have_one_component_and_links_more() {
        for e in entries() {
            let c = e.braid().component_count();
            if e.name.starts_with('L') {
                assert!(c > 1, "{} should be a link", e.name);
            } else {
                assert_eq!(c, 1, "{} should be a knot", e.name);
            }
        }
    }

    #[test]
    fn lookup_by_name_and_alias() {
        assert_eq!(lookup("4_1").unwrap().signed_word(), vec![1, -2, 1, -2]);
        assert_eq!(lookup("Trefoil").unwrap().signed_word(), vec![1, 1, 1]);
        assert_eq!(lookup("hopf link").unwrap().component_count(), 2);
        assert!(matches!(lookup("9_42"), Err(Error::UnknownKnot(_))));
    }

    #[test]
    fn names_win_over_letter_notation() {
        assert_eq!(resolve("trefoil").unwrap().signed_word(), vec![1, 1, 1]);
        assert_eq!(resolve("unknot").unwrap(), find("0_1").unwrap().braid());
        assert_eq!(resolve("cinquefoil").unwrap().crossings(), 5);
        assert_eq!(resolve("aBaB").unwrap().signed_word(), vec![1, -2, 1, -2]);
        assert_eq!(resolve("3: 1 1").unwrap().strands(), 3);
        assert!(resolve("1 0").is_err());
    }
}
