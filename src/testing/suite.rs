//! Step sequencer
//!
//! Runs the routing-table scenario top to bottom. Identifiers captured by
//! create steps live in [`SuiteState`] and are read by later steps; a failed
//! capture aborts the run before any dependent step.

use super::cleanup::{reconcile, CleanupReport, CleanupTarget};
use super::executor::{run_command, Executor, Invocation};
use super::extract::{extract_id, ResourceId, Selector};
use super::fixtures::{self, area_scope};
use super::report::{Expectation, StepRecord, SuiteReport};
use super::stackit::{CommandLine, StackitCli};
use crate::common::{Error, Result};

/// Identifiers captured so far
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SuiteState {
    pub routing_table: Option<ResourceId>,
    pub network: Option<ResourceId>,
    pub second_routing_table: Option<ResourceId>,
    pub route: Option<ResourceId>,
}

impl SuiteState {
    pub fn routing_table(&self) -> Result<ResourceId> {
        required(&self.routing_table, "routing-table")
    }

    pub fn network(&self) -> Result<ResourceId> {
        required(&self.network, "network")
    }

    pub fn second_routing_table(&self) -> Result<ResourceId> {
        required(&self.second_routing_table, "second routing-table")
    }

    pub fn route(&self) -> Result<ResourceId> {
        required(&self.route, "route")
    }
}

fn required(slot: &Option<ResourceId>, what: &'static str) -> Result<ResourceId> {
    slot.clone().ok_or(Error::MissingIdentifier(what))
}

/// Resource types removed after the scenario, keyed by fixture name
pub fn cleanup_targets() -> Vec<CleanupTarget> {
    vec![
        CleanupTarget::new(
            "routing-table",
            [
                fixtures::ROUTING_TABLE_NAME,
                fixtures::SECOND_ROUTING_TABLE_NAME,
            ],
            area_scope(),
        ),
        CleanupTarget::new("network", [fixtures::NETWORK_NAME], Vec::new()),
    ]
}

/// Reconcile every cleanup target
///
/// Both targets are attempted. Reports of the targets that could be listed
/// come back together with the first listing error.
pub async fn run_cleanup(
    executor: &dyn Executor,
    cli: &StackitCli,
) -> (Vec<CleanupReport>, Option<Error>) {
    let mut reports = Vec::new();
    let mut first_error = None;

    for target in cleanup_targets() {
        let names: Vec<&str> = target.names.iter().map(String::as_str).collect();
        tracing::info!(
            "Cleanup: Removing all {}s named {}.",
            target.resource,
            names.join(" or ")
        );

        match reconcile(executor, cli, &target).await {
            Ok(report) => reports.push(report),
            Err(e) => {
                tracing::error!("Cleanup of {} failed: {e}", target.resource);
                first_error.get_or_insert(e);
            }
        }
    }

    (reports, first_error)
}

/// The scripted routing-table scenario
pub struct Suite<'a> {
    executor: &'a dyn Executor,
    cli: &'a StackitCli,
    state: SuiteState,
    steps: Vec<StepRecord>,
}

impl<'a> Suite<'a> {
    pub fn new(executor: &'a dyn Executor, cli: &'a StackitCli) -> Self {
        Self {
            executor,
            cli,
            state: SuiteState::default(),
            steps: Vec::new(),
        }
    }

    /// Run every step, then clean up fixture resources
    pub async fn run(mut self) -> Result<SuiteReport> {
        self.configure_project().await?;

        let routing_table = self
            .create_routing_table(fixtures::ROUTING_TABLE_NAME, "Create routing-table rt_test")
            .await?;
        self.state.routing_table = Some(routing_table);

        let network = self.create_network().await?;
        self.state.network = Some(network);
        self.verify_network().await?;

        let second = self
            .create_routing_table(
                fixtures::SECOND_ROUTING_TABLE_NAME,
                "Create routing-table rt_test_2",
            )
            .await?;
        self.state.second_routing_table = Some(second);

        self.rebind_network().await?;
        self.inspect_routing_tables().await?;
        self.delete_second_routing_table().await?;
        self.update_routing_table().await?;

        let route = self.create_routes().await?;
        self.state.route = Some(route);

        self.negative_tests().await?;
        self.route_lifecycle().await?;

        let (cleanup, cleanup_error) = run_cleanup(self.executor, self.cli).await;

        Ok(SuiteReport {
            steps: self.steps,
            cleanup,
            cleanup_error,
            state: self.state,
        })
    }

    /// Run a step whose failure is recorded, never raised
    async fn step(&mut self, expected: Expectation, invocation: Invocation) -> Result<()> {
        let execution = run_command(self.executor, &invocation)
            .await
            .map_err(|e| Error::step(&invocation.description, e))?;
        let record = StepRecord {
            description: invocation.description,
            expected,
            code: execution.code,
        };

        match (record.expected, record.as_expected()) {
            (Expectation::Failure, true) => {
                tracing::info!("Failed as expected: {}", record.description)
            }
            (Expectation::Failure, false) => {
                tracing::warn!("Expected failure but succeeded: {}", record.description)
            }
            _ => {}
        }

        self.steps.push(record);
        Ok(())
    }

    async fn expect_success(&mut self, invocation: Invocation) -> Result<()> {
        self.step(Expectation::Success, invocation).await
    }

    /// Run a create step and capture the identifier it prints
    async fn capture(&mut self, invocation: Invocation, selector: &str) -> Result<ResourceId> {
        let id = extract_id(self.executor, &invocation, &Selector::parse(selector)).await?;
        self.steps.push(StepRecord {
            description: invocation.description,
            expected: Expectation::Success,
            code: 0,
        });
        Ok(id)
    }

    async fn configure_project(&mut self) -> Result<()> {
        let inv = self
            .cli
            .command(["config", "set"])
            .flag("project-id", fixtures::PROJECT_ID)
            .describe("Set project ID");
        self.expect_success(inv).await
    }

    async fn create_routing_table(&mut self, name: &str, description: &str) -> Result<ResourceId> {
        let inv = self
            .cli
            .command(["routing-table", "create"])
            .args(&area_scope())
            .flag("name", name)
            .confirm()
            .describe(description);
        self.capture(inv, ".id").await
    }

    async fn create_network(&mut self) -> Result<ResourceId> {
        let routing_table = self.state.routing_table()?;
        let inv = self
            .cli
            .command(["network", "create"])
            .flag("name", fixtures::NETWORK_NAME)
            .flag("routing-table-id", routing_table.as_str())
            .confirm()
            .describe("Create network with RT ID");
        self.capture(inv, ".id").await
    }

    async fn verify_network(&mut self) -> Result<()> {
        let network = self.state.network()?;

        let list = self
            .cli
            .command(["network", "list"])
            .output("pretty")
            .describe("List networks (check RT ID shown)");
        self.expect_success(list).await?;

        let describe = self
            .cli
            .command(["network", "describe"])
            .id(&network)
            .describe("Describe network");
        self.expect_success(describe).await
    }

    async fn rebind_network(&mut self) -> Result<()> {
        let network = self.state.network()?;
        let second = self.state.second_routing_table()?;
        let inv = self
            .cli
            .command(["network", "update"])
            .id(&network)
            .flag("routing-table-id", second.as_str())
            .confirm()
            .describe("Update network with RT 2 ID");
        self.expect_success(inv).await
    }

    /// Both tables stay describable after the network moved
    async fn inspect_routing_tables(&mut self) -> Result<()> {
        let tables = [
            (self.state.routing_table()?, "Describe routing-table 1"),
            (self.state.second_routing_table()?, "Describe routing-table 2"),
        ];
        for (id, description) in tables {
            let inv = self
                .cli
                .command(["routing-table", "describe"])
                .id(&id)
                .args(&area_scope())
                .output("pretty")
                .describe(description);
            self.expect_success(inv).await?;
        }

        let list = self
            .cli
            .command(["routing-table", "list"])
            .args(&area_scope())
            .output("pretty")
            .describe("List routing-tables");
        self.expect_success(list).await
    }

    async fn delete_second_routing_table(&mut self) -> Result<()> {
        let second = self.state.second_routing_table()?;
        let inv = self
            .cli
            .command(["routing-table", "delete"])
            .id(&second)
            .args(&area_scope())
            .confirm()
            .describe("Delete second routing-table");
        self.expect_success(inv).await
    }

    /// Each update mixes a different set of optional flags
    async fn update_routing_table(&mut self) -> Result<()> {
        let routing_table = self.state.routing_table()?;
        let update = || {
            self.cli
                .command(["routing-table", "update"])
                .id(&routing_table)
                .args(&area_scope())
        };

        let updates = [
            update()
                .flag("description", fixtures::ROUTING_TABLE_DESCRIPTION)
                .switch("non-dynamic-routes")
                .confirm()
                .describe("Update RT: disable dynamic-routes"),
            update()
                .flag("description", fixtures::ROUTING_TABLE_DESCRIPTION)
                .confirm()
                .describe("Update RT: re-enable dynamic-routes"),
            update()
                .flag("name", fixtures::ROUTING_TABLE_NAME)
                .confirm()
                .describe("Update RT: name"),
            update()
                .flag("labels", fixtures::ROUTING_TABLE_LABELS)
                .flag("name", fixtures::ROUTING_TABLE_NAME)
                .confirm()
                .describe("Update RT: labels + name"),
        ];

        for inv in updates {
            self.expect_success(inv).await?;
        }
        Ok(())
    }

    /// Three default routes with different next-hop kinds; only the first
    /// identifier is kept
    async fn create_routes(&mut self) -> Result<ResourceId> {
        let routing_table = self.state.routing_table()?;
        let route = |next_hop: &str| {
            self.cli
                .command(["routing-table", "route", "create"])
                .flag("routing-table-id", routing_table.as_str())
                .args(&area_scope())
                .confirm()
                .flag("destination-type", "cidrv4")
                .flag("destination-value", fixtures::DEFAULT_DESTINATION)
                .flag("nexthop-type", next_hop)
        };

        let ipv4 = route("ipv4")
            .flag("nexthop-value", fixtures::NEXT_HOP_ADDRESS)
            .describe("Create route with next-hop IPv4");
        let blackhole = route("blackhole").describe("Create route with next-hop blackhole");
        let internet = route("internet").describe("Create route with next-hop internet");

        let id = self.capture(ipv4, ".items.0.id").await?;
        self.expect_success(blackhole).await?;
        self.expect_success(internet).await?;
        Ok(id)
    }

    /// Invalid enum values must be rejected; the run continues either way
    async fn negative_tests(&mut self) -> Result<()> {
        let routing_table = self.state.routing_table()?;
        let route = |destination_type: &str, next_hop: &str| {
            self.cli
                .command(["routing-table", "route", "create"])
                .flag("routing-table-id", routing_table.as_str())
                .args(&area_scope())
                .flag("destination-type", destination_type)
                .flag("destination-value", fixtures::DEFAULT_DESTINATION)
                .flag("nexthop-type", next_hop)
        };

        let invalid_next_hop =
            route("cidrv4", "error").describe("Negative test: invalid next-hop");
        let invalid_destination =
            route("error", "internet").describe("Negative test: invalid destination-type");

        self.step(Expectation::Failure, invalid_next_hop).await?;
        self.step(Expectation::Failure, invalid_destination).await
    }

    async fn route_lifecycle(&mut self) -> Result<()> {
        let routing_table = self.state.routing_table()?;
        let route_id = self.state.route()?;
        let routes = |action: &str| self.cli.command(["routing-table", "route", action]);
        let scoped = |line: CommandLine| {
            line.flag("routing-table-id", routing_table.as_str())
                .args(&area_scope())
        };

        let invocations = [
            scoped(routes("list"))
                .output("pretty")
                .describe("List all routing-table routes"),
            scoped(routes("describe").id(&route_id))
                .output("pretty")
                .describe("Describe route"),
            scoped(routes("update").id(&route_id))
                .flag("labels", fixtures::ROUTE_LABELS)
                .confirm()
                .describe("Update route labels"),
            scoped(routes("delete").id(&route_id))
                .confirm()
                .describe("Delete route"),
        ];

        for inv in invocations {
            self.expect_success(inv).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::executor::Execution;
    use crate::testing::fake::{failed, succeeded, ScriptedExecutor};

    /// Behaves like a healthy backend with an empty scope
    fn backend(inv: &Invocation) -> Execution {
        let yaml = inv.has_arg("yaml");
        if inv.has_arg("error") {
            failed(1, "Error: invalid argument")
        } else if inv.has_arg("create") && inv.has_arg("route") && yaml {
            succeeded("- id: route-1\n")
        } else if inv.has_arg("create") && inv.has_arg("network") && yaml {
            succeeded("id: net-1\nname: network-rt\n")
        } else if inv.has_arg("create") && yaml {
            if inv.has_arg(fixtures::SECOND_ROUTING_TABLE_NAME) {
                succeeded("id: rt-2\nname: rt_test_2\n")
            } else {
                succeeded("id: rt-1\nname: rt_test\n")
            }
        } else if inv.has_arg("list") && yaml {
            succeeded("[]\n")
        } else {
            succeeded("ok")
        }
    }

    fn descriptions(report: &SuiteReport) -> Vec<&str> {
        report.steps.iter().map(|s| s.description.as_str()).collect()
    }

    #[tokio::test]
    async fn test_full_run_threads_identifiers() {
        let exec = ScriptedExecutor::new(backend);
        let cli = StackitCli::new("stackit");

        let report = Suite::new(&exec, &cli).run().await.unwrap();
        assert!(report.passed(), "mismatches: {:?}", report.mismatches());

        assert_eq!(report.state.routing_table.as_ref().unwrap().as_str(), "rt-1");
        assert_eq!(report.state.network.as_ref().unwrap().as_str(), "net-1");
        assert_eq!(
            report.state.second_routing_table.as_ref().unwrap().as_str(),
            "rt-2"
        );
        assert_eq!(report.state.route.as_ref().unwrap().as_str(), "route-1");

        let calls = exec.calls();
        let rebind = calls
            .iter()
            .find(|c| c.description == "Update network with RT 2 ID")
            .unwrap();
        assert_eq!(
            rebind.args(),
            ["network", "update", "net-1", "--routing-table-id", "rt-2", "-y"]
        );

        let delete_second = calls
            .iter()
            .find(|c| c.description == "Delete second routing-table")
            .unwrap();
        assert!(delete_second.has_arg("rt-2"));
        assert!(!delete_second.has_arg("rt-1"));

        let describe_route = calls
            .iter()
            .find(|c| c.description == "Describe route")
            .unwrap();
        assert!(describe_route.has_arg("route-1"));
        assert!(describe_route.has_arg("rt-1"));
    }

    #[tokio::test]
    async fn test_negative_steps_fail_and_run_continues() {
        let exec = ScriptedExecutor::new(backend);
        let cli = StackitCli::new("stackit");

        let report = Suite::new(&exec, &cli).run().await.unwrap();
        let names = descriptions(&report);

        let negative = names
            .iter()
            .position(|d| *d == "Negative test: invalid next-hop")
            .unwrap();
        assert_eq!(names[negative + 1], "Negative test: invalid destination-type");
        assert_eq!(names[negative + 2], "List all routing-table routes");

        for step in &report.steps[negative..negative + 2] {
            assert_eq!(step.expected, Expectation::Failure);
            assert_ne!(step.code, 0);
        }
        assert_eq!(report.cleanup.len(), 2);
    }

    #[tokio::test]
    async fn test_negative_step_that_succeeds_is_reported() {
        // A backend that accepts anything
        let exec = ScriptedExecutor::new(|inv| {
            if inv.has_arg("error") {
                succeeded("accepted")
            } else {
                backend(inv)
            }
        });
        let cli = StackitCli::new("stackit");

        let report = Suite::new(&exec, &cli).run().await.unwrap();
        assert!(!report.passed());
        let mismatched: Vec<_> = report
            .mismatches()
            .iter()
            .map(|s| s.description.clone())
            .collect();
        assert_eq!(
            mismatched,
            [
                "Negative test: invalid next-hop",
                "Negative test: invalid destination-type"
            ]
        );
    }

    #[tokio::test]
    async fn test_failed_soft_step_does_not_stop_run() {
        let exec = ScriptedExecutor::new(|inv| {
            if inv.description == "Set project ID" {
                failed(1, "no config")
            } else {
                backend(inv)
            }
        });
        let cli = StackitCli::new("stackit");

        let report = Suite::new(&exec, &cli).run().await.unwrap();
        assert_eq!(report.mismatches().len(), 1);
        assert_eq!(report.steps.last().unwrap().description, "Delete route");
    }

    #[tokio::test]
    async fn test_failed_extraction_stops_run() {
        let exec = ScriptedExecutor::new(|inv| {
            if inv.has_arg("network") && inv.has_arg("create") {
                succeeded("[]\n")
            } else {
                backend(inv)
            }
        });
        let cli = StackitCli::new("stackit");

        let err = Suite::new(&exec, &cli).run().await.unwrap_err();
        match err {
            Error::Extraction { description, .. } => {
                assert_eq!(description, "Create network with RT ID")
            }
            other => panic!("Expected Extraction error, got {other:?}"),
        }

        let calls = exec.calls();
        assert_eq!(
            calls.last().unwrap().description,
            "Create network with RT ID"
        );
        assert!(!calls.iter().any(|c| c.has_arg("delete")));
    }

    #[tokio::test]
    async fn test_cleanup_targets_fixture_names() {
        let listing = "\
- id: rt-1
  name: rt_test
- id: rt-2
  name: rt_test_2
- id: rt-9
  name: unrelated
";
        let exec = ScriptedExecutor::new(move |inv| {
            if inv.has_arg("routing-table") && inv.has_arg("list") {
                succeeded(listing)
            } else if inv.has_arg("list") {
                succeeded("- id: net-1\n  name: network-rt\n- id: net-2\n  name: prod\n")
            } else {
                succeeded("")
            }
        });
        let cli = StackitCli::new("stackit");

        let (reports, error) = run_cleanup(&exec, &cli).await;
        assert!(error.is_none());
        assert_eq!(reports[0].deleted, ["rt_test", "rt_test_2"]);
        assert_eq!(reports[1].deleted, ["network-rt"]);

        let deleted: Vec<String> = exec
            .calls()
            .iter()
            .filter(|c| c.has_arg("delete"))
            .map(|c| c.args()[2].clone())
            .collect();
        assert_eq!(deleted, ["rt-1", "rt-2", "net-1"]);
    }

    #[tokio::test]
    async fn test_cleanup_attempts_every_target() {
        let exec = ScriptedExecutor::new(|inv| {
            if inv.has_arg("routing-table") {
                failed(1, "forbidden")
            } else {
                succeeded("- id: net-1\n  name: network-rt\n")
            }
        });
        let cli = StackitCli::new("stackit");

        let (reports, error) = run_cleanup(&exec, &cli).await;
        assert!(matches!(error, Some(Error::CommandFailed { .. })));
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].deleted, ["network-rt"]);
        assert!(exec
            .calls()
            .iter()
            .any(|c| c.has_arg("network") && c.has_arg("delete")));
    }

    #[tokio::test]
    async fn test_failed_cleanup_listing_keeps_step_records() {
        let exec = ScriptedExecutor::new(|inv| {
            if inv.has_arg("network") && inv.has_arg("list") && inv.has_arg("yaml") {
                failed(1, "service unavailable")
            } else if inv.has_arg("error") {
                succeeded("accepted")
            } else {
                backend(inv)
            }
        });
        let cli = StackitCli::new("stackit");

        let report = Suite::new(&exec, &cli).run().await.unwrap();
        assert!(!report.passed());
        assert_eq!(report.steps.last().unwrap().description, "Delete route");
        assert_eq!(report.mismatches().len(), 2);
        assert_eq!(report.cleanup.len(), 1);
        match &report.cleanup_error {
            Some(Error::CommandFailed { description, .. }) => {
                assert_eq!(description, "Cleanup list network")
            }
            other => panic!("Expected listing failure, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_failed_cleanup_delete_fails_the_run() {
        let exec = ScriptedExecutor::new(|inv| {
            if inv.has_arg("routing-table") && inv.has_arg("list") && inv.has_arg("yaml") {
                succeeded("- id: rt-1\n  name: rt_test\n")
            } else if inv.description.starts_with("Cleanup delete") {
                failed(1, "conflict")
            } else {
                backend(inv)
            }
        });
        let cli = StackitCli::new("stackit");

        let report = Suite::new(&exec, &cli).run().await.unwrap();
        assert!(report.mismatches().is_empty());
        assert_eq!(report.cleanup[0].failed, ["rt_test"]);
        assert!(!report.passed());
    }

    #[tokio::test]
    async fn test_spawn_failure_names_the_step() {
        struct Unspawnable;

        #[async_trait::async_trait]
        impl Executor for Unspawnable {
            async fn execute(&self, invocation: &Invocation) -> Result<Execution> {
                Err(Error::Spawn {
                    program: invocation.program().to_string(),
                    source: std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
                })
            }
        }

        let cli = StackitCli::new("stackit");
        let err = Suite::new(&Unspawnable, &cli).run().await.unwrap_err();
        match err {
            Error::Step { description, source } => {
                assert_eq!(description, "Set project ID");
                assert!(matches!(*source, Error::Spawn { .. }));
            }
            other => panic!("Expected Step error, got {other:?}"),
        }
    }

    #[test]
    fn test_missing_identifier() {
        let state = SuiteState::default();
        assert!(matches!(
            state.route(),
            Err(Error::MissingIdentifier("route"))
        ));
    }
}
