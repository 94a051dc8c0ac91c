use std::path::Path;
use std::process;

use clap::Args;
use knotgen::invariant::{self, seifert, InvariantSet};

#[derive(Args)]
pub struct InvariantsArgs {
    /// Braid word (`1 -2 1 -2`, `aBaB`, `4: 1 2 3`) or catalogue name
    pub braid: String,
    /// Also compute the Jones polynomial (exponential in crossings)
    #[arg(long)]
    pub jones: bool,
    /// Print the Seifert matrix of the braid's canonical surface
    #[arg(long)]
    pub seifert: bool,
    /// Print JSON instead of a table
    #[arg(long)]
    pub json: bool,
}

pub fn cmd_invariants(args: InvariantsArgs, config: Option<&Path>) {
    let config = super::load_config(config);
    let braid = super::resolve_braid(&args.braid);
    let set = InvariantSet {
        jones: args.jones || config.invariants.jones,
        ..config.invariants
    };

    let inv = match invariant::compute(&braid, &set) {
        Ok(inv) => inv,
        Err(e) => super::fail(e, "<braid>", &args.braid),
    };

    if args.json {
        match serde_json::to_string_pretty(&inv) {
            Ok(s) => println!("{}", s),
            Err(e) => {
                eprintln!("error: {}", e);
                process::exit(1);
            }
        }
        return;
    }

    println!("braid        {}  [{}]", braid, braid.id());
    print!("{}", inv);
    if args.seifert {
        let v = seifert::SeifertMatrix::from_braid(&braid.free_reduce());
        println!("seifert      {}×{}", v.size(), v.size());
        for i in 0..v.size() {
            let row: Vec<String> = (0..v.size()).map(|j| format!("{:>3}", v.get(i, j))).collect();
            println!("  {}", row.join(" "));
        }
    }
}
