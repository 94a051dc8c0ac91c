use clap::Args;
use knotgen::braid::catalog;
use knotgen::invariant::{self, InvariantSet};

#[derive(Args)]
pub struct CatalogArgs {
    /// Include the Jones polynomial
    #[arg(long)]
    pub jones: bool,
}

pub fn cmd_catalog(args: CatalogArgs) {
    let set = InvariantSet::default().with_jones(args.jones);
    println!(
        "{:<6} {:>3} {:>4} {:>5} {:>4}  {:<24} {}",
        "name", "n", "comp", "det", "sig", "word", "description"
    );
    for entry in catalog::entries() {
        let braid = entry.braid();
        let inv = match invariant::compute(&braid, &set) {
            Ok(inv) => inv,
            Err(e) => {
                tracing::warn!(knot = entry.name, error = %e, "invariants failed");
                continue;
            }
        };
        println!(
            "{:<6} {:>3} {:>4} {:>5} {:>4}  {:<24} {}",
            entry.name,
            entry.strands,
            inv.components,
            inv.determinant,
            inv.signature,
            braid.to_string(),
            entry.description
        );
        if let Some(j) = &inv.jones {
            println!("{:>12}V = {}", "", j.display_with("t", true));
        }
    }
}
