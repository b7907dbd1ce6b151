//! FlatZinc solution output.
//!
//! Formats solutions and session markers per the FlatZinc output
//! specification: every solution ends with `----------`, a completed search
//! with `==========`, proven infeasibility with `=====UNSATISFIABLE=====`,
//! and a deadline hit with `%% TIMEOUT`.

use std::collections::HashMap;
use std::time::Duration;

use crate::model::{Model, OutputItem, VarId};

pub const SOLUTION_SEPARATOR: &str = "----------";
pub const SEARCH_COMPLETE: &str = "==========";
pub const UNSATISFIABLE: &str = "=====UNSATISFIABLE=====";
pub const TIMEOUT: &str = "%% TIMEOUT";

/// Renders one solution's output items, separator included.
pub fn format_solution(model: &Model, values: &HashMap<VarId, i64>) -> String {
    let mut out = String::new();
    for item in &model.output_items {
        format_item(item, values, &mut out);
    }
    out.push_str(SOLUTION_SEPARATOR);
    out.push('\n');
    out
}

fn format_item(item: &OutputItem, values: &HashMap<VarId, i64>, out: &mut String) {
    let render = |var: VarId| -> String {
        let value = values.get(&var).copied().unwrap_or_default();
        if item.as_bool {
            (value != 0).to_string()
        } else {
            value.to_string()
        }
    };

    if item.bounds.is_empty() {
        let var = item.variables.first().copied();
        let text = var.map(render).unwrap_or_default();
        out.push_str(&format!("{} = {};\n", item.name, text));
        return;
    }

    let mut rendered = format!("{} = array{}d(", item.name, item.bounds.len());
    for (lo, hi) in &item.bounds {
        rendered.push_str(&format!("{}..{}, ", lo, hi));
    }
    rendered.push('[');
    for (i, &var) in item.variables.iter().enumerate() {
        if i > 0 {
            rendered.push_str(", ");
        }
        rendered.push_str(&render(var));
    }
    rendered.push_str("]);\n");
    out.push_str(&rendered);
}

/// `%%%mzn-stat` block printed after the session when requested.
pub fn format_statistics(
    solutions: usize,
    variables: usize,
    constraints: usize,
    solve_time: Duration,
) -> String {
    format!(
        "%%%mzn-stat: solutions={}\n%%%mzn-stat: variables={}\n%%%mzn-stat: propagators={}\n%%%mzn-stat: solveTime={:.3}\n%%%mzn-stat-end\n",
        solutions,
        variables,
        constraints,
        solve_time.as_secs_f64()
    )
}
