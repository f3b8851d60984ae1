//! Clone Workflow Suite
//!
//! Drives a full sweep through the public API: YAML sweep file, lattice
//! expansion, cloning, manifest replay and submission. CIME is replaced by
//! a fake runner that creates case directories the way `create_clone` does.

#[cfg(test)]
mod clone_workflow_tests {
    use async_trait::async_trait;
    use case_lattice::{
        AutoConfirm, AxisSpec, CaseLattice, CimeTools, CloneManifest, CloneOptions, CommandOutput,
        CommandRunner, CommandSpec, ExpansionMode, LatticeError, Result, SweepConfig,
    };
    use std::path::{Path, PathBuf};
    use std::sync::{Arc, Mutex};
    use tempfile::tempdir;

    #[derive(Default)]
    struct FakeCime {
        calls: Mutex<Vec<CommandSpec>>,
    }

    impl FakeCime {
        fn programs(&self) -> Vec<String> {
            self.calls
                .lock()
                .unwrap()
                .iter()
                .map(|c| c.program_name())
                .collect()
        }
    }

    #[async_trait]
    impl CommandRunner for FakeCime {
        async fn run(&self, command: &CommandSpec) -> Result<CommandOutput> {
            self.calls.lock().unwrap().push(command.clone());
            if command.program_name() == "create_clone" {
                let case = PathBuf::from(&command.args[1]);
                std::fs::create_dir_all(&case).unwrap();
                std::fs::write(case.join("user_nl_cam"), "! defaults\nnhtfrq = -24\na = 0\n").unwrap();
            }
            Ok(CommandOutput::default())
        }
    }

    fn root_case(dir: &Path) -> PathBuf {
        let root = dir.join("cases").join("F2000");
        std::fs::create_dir_all(&root).unwrap();
        root
    }

    // The a/b example: four points, first axis fastest, filter on a == 1.
    #[tokio::test]
    async fn test_two_axis_sweep_with_filter() {
        let dir = tempdir().unwrap();
        let root = root_case(dir.path());
        let runner = Arc::new(FakeCime::default());
        let mut lattice = CaseLattice::new("cam", ExpansionMode::Combinatorial)
            .with_runner(runner.clone())
            .with_tools(CimeTools::new("/opt/cime/scripts"));
        lattice.expand(AxisSpec::values("a", [1, 2])).unwrap();
        lattice.expand(AxisSpec::values("b", [10, 20])).unwrap();
        assert_eq!(lattice.lattice().unwrap().len(), 4);

        lattice
            .filter_by(|row| row.get("a").and_then(|v| v.as_f64()) == Some(1.0))
            .unwrap();
        let options = CloneOptions {
            top_clone_dir: Some(dir.path().join("sweep")),
            ..CloneOptions::new(&root)
        };
        let records = lattice.create_clones(&options).await.unwrap().to_vec();

        assert_eq!(records.len(), 2);
        let text = std::fs::read_to_string(records[1].case_dir.join("user_nl_cam")).unwrap();
        assert_eq!(text, "! defaults\nnhtfrq = -24\na = 1\nb = 20\n");
        assert_eq!(runner.programs(), vec!["create_clone", "create_clone"]);
    }

    #[tokio::test]
    async fn test_manifest_replay_submits() {
        let dir = tempdir().unwrap();
        let root = root_case(dir.path());
        let sweep_dir = dir.path().join("sweep");
        let runner = Arc::new(FakeCime::default());

        let mut lattice = CaseLattice::new("cam", ExpansionMode::Paired)
            .with_runner(runner.clone())
            .with_tools(CimeTools::new("/opt/cime/scripts"));
        lattice.expand(AxisSpec::values("a", [1, 2])).unwrap();
        lattice.expand(AxisSpec::values("STOP_N", [3, 6]).xml()).unwrap();
        let options = CloneOptions {
            top_clone_dir: Some(sweep_dir.clone()),
            ..CloneOptions::new(&root)
        };
        lattice.create_clones(&options).await.unwrap();

        let manifest = CloneManifest::load(&sweep_dir).await.unwrap();
        assert_eq!(manifest.component, "cam");
        assert_eq!(manifest.clones.len(), 2);

        let replay = CaseLattice::new(manifest.component, ExpansionMode::default())
            .with_runner(runner.clone())
            .with_clones(manifest.clones);
        let submitted = replay.submit_clone_runs(false).await.unwrap();

        assert_eq!(submitted[0], sweep_dir.join("F2000__a_1__STOP_N_3"));
        assert_eq!(
            runner.programs(),
            vec!["create_clone", "xmlchange", "create_clone", "xmlchange", "case.submit", "case.submit"]
        );
    }

    #[tokio::test]
    async fn test_conflict_leaves_earlier_clones() {
        let dir = tempdir().unwrap();
        let root = root_case(dir.path());
        let sweep_dir = dir.path().join("sweep");
        std::fs::create_dir_all(sweep_dir.join("F2000__a_2__b_10")).unwrap();

        let mut lattice = CaseLattice::new("cam", ExpansionMode::Combinatorial)
            .with_runner(Arc::new(FakeCime::default()))
            .with_tools(CimeTools::new("/opt/cime/scripts"))
            .with_confirmation(Arc::new(AutoConfirm(false)));
        lattice.expand(AxisSpec::values("a", [1, 2])).unwrap();
        lattice.expand(AxisSpec::values("b", [10, 20])).unwrap();
        let options = CloneOptions {
            top_clone_dir: Some(sweep_dir.clone()),
            ..CloneOptions::new(&root)
        };

        let err = lattice.create_clones(&options).await.unwrap_err();
        assert!(matches!(err, LatticeError::ClonePathConflict { .. }));
        assert!(sweep_dir.join("F2000__a_1__b_10").join("user_nl_cam").exists());
        assert!(!sweep_dir.join("F2000__a_1__b_20").exists());
    }

    #[tokio::test]
    async fn test_sweep_file_end_to_end() {
        let dir = tempdir().unwrap();
        let root = root_case(dir.path());
        let yaml = format!(
            "component: cam\naxes:\n  - name: a\n    values: [1, 2]\n  - name: \"p1,p2\"\n    group: diff\n    values: [\"2,2\", \"4,4\"]\nclone:\n  root_case: {}\n  top_clone_dir: {}\n",
            root.display(),
            dir.path().join("sweep").display()
        );
        let path = dir.path().join("sweep.yaml");
        std::fs::write(&path, yaml).unwrap();

        let config = SweepConfig::load(&path).unwrap();
        let runner = Arc::new(FakeCime::default());
        let mut lattice = config.build().unwrap().with_runner(runner.clone());
        let records = lattice.create_clones(&config.clone).await.unwrap();

        assert_eq!(records.len(), 4);
        assert_eq!(records[0].case_name, "F2000__a_1__diff_2-2");
        let text = std::fs::read_to_string(records[0].case_dir.join("user_nl_cam")).unwrap();
        assert!(text.ends_with("a = 1\np1 = 2\np2 = 2\n"));
    }
}
