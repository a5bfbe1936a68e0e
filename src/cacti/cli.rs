use anyhow::{Context, Result};
use regex_lite::Regex;
use std::path::PathBuf;
use tokio::process::Command;

/// Runs Cacti's bundled CLI scripts (`<cacti>/cli/*.php`) for operations that
/// need Cacti's own PHP internals
pub struct CactiCli {
    php_bin: String,
    cli_dir: PathBuf,
    graph_id: Regex,
}

impl CactiCli {
    pub fn new(php_bin: &str, cacti_path: &str) -> Result<Self> {
        // "Graph Added - Graph[123] - DS[45]" (1.x) or "graph-id: (123)" (0.8.x and
        // the already-exists notice)
        let graph_id = Regex::new(r"(?i)graph(?:\[|-id: \()(\d+)")?;
        Ok(Self {
            php_bin: php_bin.to_string(),
            cli_dir: PathBuf::from(cacti_path).join("cli"),
            graph_id,
        })
    }

    /// Run a script with `--key=value` arguments and return its stdout
    async fn run(&self, script: &str, args: &[String]) -> Result<String> {
        let path = self.cli_dir.join(script);
        tracing::debug!("Running {} {} {}", self.php_bin, path.display(), args.join(" "));

        let output = Command::new(&self.php_bin)
            .arg("-q")
            .arg(&path)
            .args(args)
            .output()
            .await
            .with_context(|| format!("Failed to run {}", path.display()))?;

        let stdout = String::from_utf8_lossy(&output.stdout).to_string();
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(anyhow::anyhow!(
                "{} exited with {}: {}{}",
                script,
                output.status,
                stdout.trim(),
                stderr.trim()
            ));
        }
        Ok(stdout)
    }

    pub async fn reindex(&self, host_id: i64, snmp_query_id: i64) -> Result<()> {
        self.run(
            "poller_reindex_hosts.php",
            &[format!("--id={}", host_id), format!("--qid={}", snmp_query_id)],
        )
        .await?;
        Ok(())
    }

    pub async fn rebuild_poller_cache(&self, host_id: i64) -> Result<()> {
        self.run("rebuild_poller_cache.php", &[format!("--host-id={}", host_id)])
            .await?;
        Ok(())
    }

    /// Create a host-level graph
    pub async fn add_cg_graph(&self, host_id: i64, graph_template_id: i64) -> Result<i64> {
        let out = self
            .run(
                "add_graphs.php",
                &[
                    format!("--host-id={}", host_id),
                    "--graph-type=cg".to_string(),
                    format!("--graph-template-id={}", graph_template_id),
                ],
            )
            .await?;
        self.parse_graph_id(&out)
    }

    /// Create a data query graph for the row whose `snmp_field` equals `snmp_value`
    pub async fn add_ds_graph(
        &self,
        host_id: i64,
        graph_template_id: i64,
        snmp_query_id: i64,
        query_type_id: i64,
        snmp_field: &str,
        snmp_value: &str,
    ) -> Result<i64> {
        let out = self
            .run(
                "add_graphs.php",
                &[
                    format!("--host-id={}", host_id),
                    "--graph-type=ds".to_string(),
                    format!("--graph-template-id={}", graph_template_id),
                    format!("--snmp-query-id={}", snmp_query_id),
                    format!("--snmp-query-type-id={}", query_type_id),
                    format!("--snmp-field={}", snmp_field),
                    format!("--snmp-value={}", snmp_value),
                ],
            )
            .await?;
        self.parse_graph_id(&out)
    }

    /// Extract the graph id from add_graphs.php output
    fn parse_graph_id(&self, output: &str) -> Result<i64> {
        self.graph_id
            .captures(output)
            .and_then(|c| c.get(1))
            .and_then(|m| m.as_str().parse().ok())
            .with_context(|| format!("No graph id in add_graphs.php output: {}", output.trim()))
    }
}
