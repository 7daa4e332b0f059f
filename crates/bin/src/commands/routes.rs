//! Routes command - list the public-route predicates in order.

use servicehub::{Settings, guard::RoutePredicate};

use crate::output::{OutputFormat, print_json, print_table};

/// Run the routes command
pub fn run(settings: &Settings, format: OutputFormat) -> Result<(), Box<dyn std::error::Error>> {
    let table = settings.route_table();

    match format {
        OutputFormat::Human => {
            let rows: Vec<Vec<String>> = table
                .predicates()
                .iter()
                .map(|p| {
                    let kind = match p {
                        RoutePredicate::Exact(_) => "exact",
                        RoutePredicate::Subtree(_) => "subtree",
                    };
                    vec![p.path().to_string(), kind.to_string()]
                })
                .collect();
            print_table(&["PATH", "MATCH"], &rows);
            println!("\n{} public routes; everything else is protected.", rows.len());
        }
        OutputFormat::Json => print_json(table.predicates())?,
    }

    Ok(())
}
