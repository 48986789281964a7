//! Preset task graphs.
//!
//! Both orchestrator presets share the same core: clean first, then the
//! preprocess→images chain in parallel with the script bundle, and finally
//! the zip. The deploy preset inserts `deploy-images` between the build
//! fan-out and the zip so freshly built assets reach the remote target
//! before packaging.

use crate::assets::Assets;
use crate::bundle::Bundle;
use crate::clean::Clean;
use crate::deploy::DeployImages;
use crate::graph::TaskGraph;
use crate::package::Package;
use crate::preprocess::Preprocess;
use crate::tools::ToolRunner;
use std::sync::Arc;

/// Build the full task graph. With `with_deploy` the zip waits on the deploy
/// step; without it the zip follows the build fan-out directly.
pub fn build_graph(tools: Arc<dyn ToolRunner>, with_deploy: bool) -> TaskGraph {
    let mut graph = TaskGraph::new();
    graph.add(Arc::new(Clean), &[]);
    graph.add(Arc::new(Preprocess), &["clean"]);
    graph.add(Arc::new(Assets::new(tools.clone())), &["preprocess"]);
    graph.add(Arc::new(Bundle::new(tools.clone())), &["clean"]);
    if with_deploy {
        graph.add(
            Arc::new(DeployImages::new(tools.clone())),
            &["images", "bundle"],
        );
        graph.add(Arc::new(Package::new(tools)), &["deploy-images"]);
    } else {
        graph.add(Arc::new(Package::new(tools)), &["images", "bundle"]);
    }
    graph
}
