use std::path::PathBuf;
use std::process::Stdio;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tokio::time::{timeout, Duration};

use super::{DecisionProcedure, SatResult, SolverError, Term};

/// SMT-LIB symbol for a variable name. Names that are not plain simple symbols get quoted.
pub fn symbol(name: &str) -> String {
    let simple = !name.is_empty()
        && !name.starts_with(|c: char| c.is_ascii_digit())
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "~!@$%^&*_-+=<>.?/".contains(c));
    if simple {
        name.to_string()
    } else {
        format!("|{}|", name.replace(['|', '\\'], "_"))
    }
}

pub fn render_term(term: &Term) -> String {
    match term {
        Term::Var(name) => symbol(name),
        Term::Const(true) => "true".to_string(),
        Term::Const(false) => "false".to_string(),
        Term::Not(inner) => format!("(not {})", render_term(inner)),
        Term::And(terms) => render_nary("and", terms, "true"),
        Term::Or(terms) => render_nary("or", terms, "false"),
        Term::Implies(left, right) => {
            format!("(=> {} {})", render_term(left), render_term(right))
        }
        Term::Xor(left, right) => format!("(xor {} {})", render_term(left), render_term(right)),
    }
}

fn render_nary(operator: &str, terms: &[Term], empty: &str) -> String {
    match terms {
        [] => empty.to_string(),
        [single] => render_term(single),
        _ => {
            let rendered: Vec<String> = terms.iter().map(render_term).collect();
            format!("({operator} {})", rendered.join(" "))
        }
    }
}

/// Complete script: one `Bool` declaration per variable, the assertions, and `(check-sat)`.
pub fn render_script(assertions: &[Term]) -> String {
    let mut vars = Vec::new();
    for assertion in assertions {
        assertion.collect_vars(&mut vars);
    }

    let mut script = String::new();
    for var in vars {
        script.push_str(&format!("(declare-const {} Bool)\n", symbol(var)));
    }
    for assertion in assertions {
        script.push_str(&format!("(assert {})\n", render_term(assertion)));
    }
    script.push_str("(check-sat)\n");
    script
}

/// Out-of-process procedure speaking SMT-LIB 2 over stdin, e.g. `z3 -in`.
///
/// Every check spawns a fresh process, so no assertion outlives its call.
#[derive(Debug, Clone)]
pub struct SmtLibProcess {
    executable: PathBuf,
    args: Vec<String>,
    timeout_secs: u64,
}

impl SmtLibProcess {
    pub fn new(executable: PathBuf, args: Vec<String>, timeout_secs: u64) -> Self {
        Self {
            executable,
            args,
            timeout_secs,
        }
    }

    /// Resolve `command` on `PATH` (or as a path) before constructing the process wrapper.
    pub fn locate(command: &str, args: Vec<String>, timeout_secs: u64) -> Result<Self, SolverError> {
        let executable =
            which::which(command).map_err(|_| SolverError::NotFound(command.to_string()))?;
        Ok(Self::new(executable, args, timeout_secs))
    }

    async fn run(&self, script: String) -> Result<String, SolverError> {
        let mut child = Command::new(&self.executable)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|err| SolverError::ExecutionFailed(err.to_string()))?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(script.as_bytes()).await?;
            stdin.shutdown().await?;
        }

        let output = child.wait_with_output().await?;
        if !output.status.success() && output.stdout.is_empty() {
            let stderr = String::from_utf8_lossy(&output.stderr).to_string();
            return Err(SolverError::ExecutionFailed(stderr));
        }

        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }
}

pub(crate) fn parse_answer(stdout: &str) -> Result<SatResult, SolverError> {
    let first = stdout
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .unwrap_or("");
    match first {
        "sat" => Ok(SatResult::Sat),
        "unsat" => Ok(SatResult::Unsat),
        "unknown" => Ok(SatResult::Unknown),
        other => Err(SolverError::UnexpectedOutput(other.to_string())),
    }
}

#[async_trait]
impl DecisionProcedure for SmtLibProcess {
    fn name(&self) -> &str {
        "smtlib"
    }

    async fn check(&self, assertions: &[Term]) -> Result<SatResult, SolverError> {
        let script = render_script(assertions);
        let stdout = timeout(Duration::from_secs(self.timeout_secs), self.run(script))
            .await
            .map_err(|_| SolverError::Timeout(self.timeout_secs))??;
        parse_answer(&stdout)
    }
}
