use std::io::{self, Write};

use tracing::info;

use crate::{render, Fabric, LabelStyle, RootSet, TopologyError};

#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// Graphviz DOT.
    #[default]
    Dot,
    /// Slurm `topology.conf`.
    Slurm,
}

/// Which transforms to run on a parsed fabric and how to print the result.
#[derive(Debug, Clone, Default)]
pub struct Pipeline {
    pub switches_only: bool,
    pub short_labels: bool,
    pub roots: Option<RootSet>,
    pub format: OutputFormat,
}

impl Pipeline {
    /// Slurm output needs short switch names, so it implies short labels.
    pub fn label_style(&self) -> LabelStyle {
        if self.short_labels || self.format == OutputFormat::Slurm {
            LabelStyle::Short
        } else {
            LabelStyle::Full
        }
    }

    /// Switch filter, then tree derivation, then relabeling, as configured.
    pub fn transform(&self, mut fabric: Fabric) -> Result<Fabric, TopologyError> {
        if self.switches_only {
            fabric = fabric.only_switches();
            info!(switches = fabric.node_count(), "dropped hosts");
        }

        if let Some(roots) = &self.roots {
            fabric = fabric.treeify(roots)?;
            if self.label_style() == LabelStyle::Short {
                fabric.relabel_switch_tree();
            }
        }

        Ok(fabric)
    }

    pub fn render(&self, fabric: &Fabric, out: impl Write) -> io::Result<()> {
        match self.format {
            OutputFormat::Dot => render::write_dot(fabric, out),
            OutputFormat::Slurm => render::write_slurm(fabric, out),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::test_util::FABRIC;

    fn run(pipeline: &Pipeline) -> Result<String, TopologyError> {
        let fabric = Fabric::from_ibnetdiscover(FABRIC.as_bytes(), pipeline.label_style())?;
        let fabric = pipeline.transform(fabric)?;
        let mut out = Vec::new();
        pipeline.render(&fabric, &mut out)?;
        Ok(String::from_utf8(out).unwrap())
    }

    fn spines() -> RootSet {
        "# spines\nS-7cfe900300a0b000\nS-7cfe900300a0e000 # spine02\n"
            .parse()
            .unwrap()
    }

    #[test]
    fn test_slurm_implies_short_labels() {
        let pipeline = Pipeline {
            format: OutputFormat::Slurm,
            ..Pipeline::default()
        };
        assert_eq!(pipeline.label_style(), LabelStyle::Short);
        assert_eq!(Pipeline::default().label_style(), LabelStyle::Full);
    }

    #[test]
    fn test_default_pipeline_renders_full_digraph() {
        let text = run(&Pipeline::default()).unwrap();

        assert!(text.starts_with("digraph {"));
        assert!(text.contains("MF0;leaf02:MSB7800/U1"));
        assert!(text.contains(r#"label = "node03""#));
    }

    #[test]
    fn test_switch_only_tree_for_slurm() {
        let pipeline = Pipeline {
            switches_only: true,
            roots: Some(spines()),
            format: OutputFormat::Slurm,
            ..Pipeline::default()
        };

        assert_eq!(
            run(&pipeline).unwrap(),
            "# topology.conf generated by ibtopotool\n\
             SwitchName=s0-0 Switches=s1-[0-1]\n\
             SwitchName=s0-1 Switches=s1-[0-1]\n\
             SwitchName=s1-0\n\
             SwitchName=s1-1\n"
        );
    }

    #[test]
    fn test_tree_without_short_labels_keeps_full_labels() {
        let pipeline = Pipeline {
            roots: Some(spines()),
            ..Pipeline::default()
        };

        let text = run(&pipeline).unwrap();
        assert!(text.starts_with("graph {"));
        assert!(text.contains(r#"label = "S-7cfe900300a0b000\nMF0;spine01:MSB7800/U1""#));
        assert!(!text.contains("s0-0"));
    }

    #[test]
    fn test_root_removed_by_switch_filter() {
        let pipeline = Pipeline {
            switches_only: true,
            roots: Some(RootSet::new(["H-0002c903000a0001"])),
            ..Pipeline::default()
        };

        assert!(matches!(
            run(&pipeline),
            Err(TopologyError::RootNotFound(guid)) if guid == "H-0002c903000a0001"
        ));
    }
}
