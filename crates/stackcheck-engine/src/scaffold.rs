//! Probe scaffolding.
//!
//! Generates new check scripts from a GIVEN/WHEN/THEN description using a
//! built-in template. The generated script satisfies the probe contract
//! out of the box: structured lines on stdout, exit 0 regardless of the
//! verdict.

use stackcheck_domain::Category;
use std::path::{Path, PathBuf};

/// Built-in probe templates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Template {
    /// HTTP endpoint status probe via the toolkit's curl wrapper.
    Http,

    /// Probe running a command inside a compose container.
    DockerExec,

    /// Redis query probe via redis-cli inside the kv container.
    RedisCli,

    /// Bare skeleton with the contract wired up and a TODO body.
    Generic,
}

impl Template {
    pub fn all() -> &'static [Template] {
        &[
            Template::Http,
            Template::DockerExec,
            Template::RedisCli,
            Template::Generic,
        ]
    }

    pub fn name(&self) -> &'static str {
        match self {
            Template::Http => "http",
            Template::DockerExec => "docker-exec",
            Template::RedisCli => "redis-cli",
            Template::Generic => "generic",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Template::Http => "probe an HTTP endpoint and assert its status code",
            Template::DockerExec => "run a command inside a compose container",
            Template::RedisCli => "query Redis through the kv container",
            Template::Generic => "empty skeleton with the result contract wired up",
        }
    }

    pub fn from_name(name: &str) -> Option<Template> {
        Template::all().iter().copied().find(|t| t.name() == name)
    }
}

/// Everything needed to generate one probe script.
#[derive(Debug, Clone)]
pub struct ScaffoldRequest {
    pub template: Template,
    pub category: Category,
    pub service: String,
    pub test: String,
    pub given: String,
    pub when: String,
    pub then: String,
}

impl ScaffoldRequest {
    /// Filename following the discovery convention.
    pub fn filename(&self) -> String {
        format!("{}-{}-{}.sh", self.category, self.service, self.test)
    }

    /// Check name emitted by the generated probe.
    fn check_name(&self) -> String {
        format!("{}_{}", self.service, self.test).replace('-', "_")
    }

    /// Render the probe script.
    pub fn render(&self) -> String {
        let header = format!(
            "#!/usr/bin/env bash\n\
             # {filename}\n\
             #\n\
             # GIVEN {given}\n\
             # WHEN  {when}\n\
             # THEN  {then}\n\
             #\n\
             # Emits STATUS|CHECK_NAME|MESSAGE|COMMAND lines on stdout and\n\
             # always exits 0; a non-zero exit means this probe itself broke.\n\
             set -u\n\
             \n\
             CHECK_TOOLS=\"${{CHECK_TOOLS:-tests/tools}}\"\n\
             . \"$CHECK_TOOLS/common.sh\"\n\
             \n",
            filename = self.filename(),
            given = self.given,
            when = self.when,
            then = self.then,
        );

        let check = self.check_name();
        let body = match self.template {
            Template::Http => format!(
                "URL=\"https://{service}.${{PUBLISH_DOMAIN:-dev.localhost}}/\"\n\
                 STATUS=$(http_status \"$URL\")\n\
                 if [ \"$STATUS\" = \"200\" ]; then\n\
                 \temit PASS {check} \"endpoint answered $STATUS\" \"curl -ks -o /dev/null -w '%{{http_code}}' $URL\"\n\
                 else\n\
                 \temit FAIL {check} \"endpoint answered $STATUS\" \"curl -ks -o /dev/null -w '%{{http_code}}' $URL\"\n\
                 fi\n\
                 exit 0\n",
                service = self.service,
                check = check,
            ),
            Template::DockerExec => format!(
                "CONTAINER=\"{service}\"\n\
                 if OUTPUT=$(compose_exec \"$CONTAINER\" true 2>/dev/null); then\n\
                 \temit PASS {check} \"container responded\" \"docker compose exec $CONTAINER true\"\n\
                 else\n\
                 \temit BROKEN {check} \"container not reachable\" \"docker compose ps $CONTAINER\"\n\
                 fi\n\
                 exit 0\n",
                service = self.service,
                check = check,
            ),
            Template::RedisCli => format!(
                "if PONG=$(redis_query ping 2>/dev/null) && [ \"$PONG\" = \"PONG\" ]; then\n\
                 \temit ENABLED {check} \"redis answered PONG\" \"docker compose exec kv redis-cli -a \\$REDIS_PASSWORD ping\"\n\
                 else\n\
                 \temit BROKEN {check} \"redis did not answer\" \"docker compose exec kv redis-cli -a \\$REDIS_PASSWORD ping\"\n\
                 fi\n\
                 exit 0\n",
                check = check,
            ),
            Template::Generic => format!(
                "# TODO: implement the check described above.\n\
                 emit INFO {check} \"not implemented yet\" \"{filename}\"\n\
                 exit 0\n",
                check = check,
                filename = self.filename(),
            ),
        };

        format!("{header}{body}")
    }

    /// Write the script into `dir` with the execute bit set.
    pub fn write(&self, dir: &Path) -> std::io::Result<PathBuf> {
        let path = dir.join(self.filename());
        std::fs::write(&path, self.render())?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755))?;
        }
        Ok(path)
    }
}
