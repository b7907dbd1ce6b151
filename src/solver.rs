//! High-level pipeline orchestration.
//!
//! [`FznSolver`] ties the stages together: tokenize, parse, lower,
//! presolve to a fix-point, clean up, schedule, extract into a back-end,
//! search, and format the session output.

use std::collections::HashMap;
use std::fs;
use std::time::{Duration, Instant};

use log::{debug, info, warn};

use crate::backend::Extractor;
use crate::cleanup::cleanup;
use crate::context::lower;
use crate::engine::{Engine, EngineExpr, EngineGoal};
use crate::error::{FznError, FznResult};
use crate::model::{Annotation, Goal, Model, VarId};
use crate::output;
use crate::presolve::Presolver;
use crate::schedule::schedule;
use crate::stats::ModelStatistics;
use crate::{parser, tokenizer, Config};

/// Options controlling one solver session.
#[derive(Debug, Clone)]
pub struct SolverOptions {
    pub config: Config,
    /// Enumerate every solution (satisfaction) or print every improving
    /// solution (optimization).
    pub all_solutions: bool,
    /// Stop after this many solutions.
    pub max_solutions: Option<usize>,
    /// Emit `%%%mzn-stat` lines after the session.
    pub statistics: bool,
    /// Wall-clock budget in milliseconds; 0 means none.
    pub timeout_ms: u64,
}

impl Default for SolverOptions {
    fn default() -> Self {
        SolverOptions {
            config: Config::default(),
            all_solutions: false,
            max_solutions: None,
            statistics: false,
            timeout_ms: 0,
        }
    }
}

/// Session verdict, in output order of precedence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolveStatus {
    /// Solutions found and the search space exhausted (or the optimum
    /// proven).
    Complete,
    /// Solutions found but the search stopped early.
    Incomplete,
    Unsatisfiable,
    TimedOut,
}

pub struct FznSolver {
    options: SolverOptions,
    model: Option<Model>,
    solutions: Vec<HashMap<VarId, i64>>,
    status: SolveStatus,
    solve_time: Duration,
    extracted_constraints: usize,
    extracted_variables: usize,
}

impl FznSolver {
    pub fn new() -> Self {
        Self::with_options(SolverOptions::default())
    }

    pub fn with_options(options: SolverOptions) -> Self {
        FznSolver {
            options,
            model: None,
            solutions: Vec::new(),
            status: SolveStatus::Unsatisfiable,
            solve_time: Duration::ZERO,
            extracted_constraints: 0,
            extracted_variables: 0,
        }
    }

    /// Parses and lowers a FlatZinc source string.
    pub fn load_str(&mut self, source: &str) -> FznResult<()> {
        let tokens = tokenizer::tokenize(source)?;
        let ast = parser::parse(tokens)?;
        let (model, _context) = lower(&ast)?;
        info!(
            "loaded {} variables, {} constraints",
            model.variables.len(),
            model.constraints.len()
        );
        self.model = Some(model);
        Ok(())
    }

    pub fn load_file(&mut self, path: &str) -> FznResult<()> {
        let source = fs::read_to_string(path)
            .map_err(|e| FznError::IoError(format!("failed to read '{}': {}", path, e)))?;
        self.load_str(&source)
    }

    /// Runs the pipeline and the search.
    pub fn solve(&mut self) -> FznResult<()> {
        let start = Instant::now();
        let deadline = match self.options.timeout_ms {
            0 => None,
            ms => Some(start + Duration::from_millis(ms)),
        };
        let mut model = self
            .model
            .take()
            .ok_or_else(|| FznError::IoError("no model loaded".to_string()))?;

        if self.options.config.workers > 1 {
            warn!(
                "requested {} workers, but the bundled engine runs single-threaded",
                self.options.config.workers
            );
        }

        let mut search_hint: Vec<VarId> = Vec::new();
        let mut presolve_timed_out = false;
        if self.options.config.presolve {
            let mut presolver = Presolver::new(deadline);
            let report = presolver.run(&mut model)?;
            presolve_timed_out = report.timed_out;
            debug!(
                "presolve: {} rewrites, infeasible={}",
                report.rewrites, report.infeasible
            );
            if report.infeasible {
                self.finish(model, Vec::new(), SolveStatus::Unsatisfiable, start);
                return Ok(());
            }
        } else if model
            .variables
            .iter()
            .any(|v| v.active && v.domain.is_empty())
        {
            self.finish(model, Vec::new(), SolveStatus::Unsatisfiable, start);
            return Ok(());
        }

        cleanup(&mut model, &self.options.config)?;

        let stats = ModelStatistics::compute(&model);
        search_hint.extend(annotation_search_order(&model));
        let order = schedule(&model)?;

        let mut engine = Engine::new(deadline);
        let exprs = Extractor::extract(&model, &mut engine, &order)?;
        self.extracted_constraints = order.len();
        self.extracted_variables = engine.var_count();

        // Branch on the annotated order first, then the remaining
        // variables by how often the constraints mention them.
        let mut hint_indices: Vec<usize> = search_hint
            .iter()
            .filter_map(|v| match exprs.get(v) {
                Some(EngineExpr::Var(index)) => Some(*index),
                _ => None,
            })
            .collect();
        let mut rest: Vec<(usize, usize)> = exprs
            .iter()
            .filter_map(|(var, expr)| match expr {
                EngineExpr::Var(index) => Some((stats.occurrences(*var), *index)),
                EngineExpr::Const(_) => None,
            })
            .collect();
        rest.sort_by(|a, b| b.0.cmp(&a.0).then(a.1.cmp(&b.1)));
        hint_indices.extend(rest.into_iter().map(|(_, index)| index));

        let goal = match model.goal() {
            Goal::Satisfy => EngineGoal::Satisfy {
                limit: if self.options.all_solutions {
                    self.options.max_solutions.unwrap_or(usize::MAX)
                } else {
                    self.options.max_solutions.unwrap_or(1)
                },
            },
            direction => {
                let objective = model
                    .objective
                    .expect("optimization goal carries an objective");
                let expr = exprs.get(&objective).copied().ok_or_else(|| {
                    FznError::inconsistent("objective variable was never extracted")
                })?;
                match direction {
                    Goal::Minimize => EngineGoal::Minimize(expr),
                    _ => EngineGoal::Maximize(expr),
                }
            }
        };

        let result = engine.solve(goal, &hint_indices);
        let timed_out = result.timed_out || presolve_timed_out;

        let mut rendered: Vec<HashMap<VarId, i64>> = result
            .solutions
            .iter()
            .map(|solution| {
                exprs
                    .iter()
                    .map(|(&var, expr)| {
                        let value = match expr {
                            EngineExpr::Var(index) => solution[*index],
                            EngineExpr::Const(v) => *v,
                        };
                        (var, value)
                    })
                    .collect()
            })
            .collect();
        // Optimization prints improving solutions only when asked;
        // otherwise the best one stands alone.
        if !matches!(model.goal(), Goal::Satisfy) && !self.options.all_solutions {
            if let Some(best) = rendered.pop() {
                rendered = vec![best];
            }
        }

        let status = if rendered.is_empty() {
            if timed_out {
                SolveStatus::TimedOut
            } else {
                SolveStatus::Unsatisfiable
            }
        } else if timed_out {
            SolveStatus::TimedOut
        } else if result.complete {
            SolveStatus::Complete
        } else {
            SolveStatus::Incomplete
        };
        self.finish(model, rendered, status, start);
        Ok(())
    }

    fn finish(
        &mut self,
        model: Model,
        solutions: Vec<HashMap<VarId, i64>>,
        status: SolveStatus,
        start: Instant,
    ) {
        self.solve_time = start.elapsed();
        self.solutions = solutions;
        self.status = status;
        self.model = Some(model);
    }

    pub fn status(&self) -> SolveStatus {
        self.status
    }

    pub fn solution_count(&self) -> usize {
        self.solutions.len()
    }

    /// The value of a named solution variable in solution `index`.
    pub fn value_in_solution(&self, index: usize, var: VarId) -> Option<i64> {
        self.solutions.get(index).and_then(|s| s.get(&var)).copied()
    }

    /// The whole session output: solutions, marker, optional statistics.
    pub fn to_flatzinc(&self) -> String {
        let model = self.model.as_ref().expect("solve() stores the model back");
        let mut out = String::new();
        for solution in &self.solutions {
            out.push_str(&output::format_solution(model, solution));
        }
        match self.status {
            SolveStatus::Complete => {
                out.push_str(output::SEARCH_COMPLETE);
                out.push('\n');
            }
            SolveStatus::Unsatisfiable => {
                out.push_str(output::UNSATISFIABLE);
                out.push('\n');
            }
            SolveStatus::TimedOut => {
                out.push_str(output::TIMEOUT);
                out.push('\n');
            }
            SolveStatus::Incomplete => {}
        }
        if self.options.statistics {
            out.push_str(&output::format_statistics(
                self.solutions.len(),
                self.extracted_variables,
                self.extracted_constraints,
                self.solve_time,
            ));
        }
        out
    }
}

impl Default for FznSolver {
    fn default() -> Self {
        Self::new()
    }
}

/// Branching order requested by `int_search`/`bool_search` annotations,
/// `seq_search` included, in appearance order.
fn annotation_search_order(model: &Model) -> Vec<VarId> {
    fn walk(ann: &Annotation, out: &mut Vec<VarId>) {
        match ann {
            Annotation::Call(name, args)
                if name.as_str() == "int_search" || name.as_str() == "bool_search" =>
            {
                if let Some(first) = args.first() {
                    first.collect_variables(out);
                }
            }
            Annotation::Call(_, args) | Annotation::List(args) => {
                for arg in args {
                    walk(arg, out);
                }
            }
            _ => {}
        }
    }
    let mut order = Vec::new();
    for ann in &model.search_annotations {
        walk(ann, &mut order);
    }
    order
}
