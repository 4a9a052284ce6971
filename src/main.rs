mod aggregation;
mod config;
mod error;
mod graph;
mod layout;
mod logging;
mod render;

use std::error::Error;
use tracing::info;

use crate::aggregation::{aggregate, load_dataset};
use crate::config::Settings;
use crate::graph::BipartiteGraph;
use crate::layout::spring_layout;
use crate::render::render;

fn main() -> Result<(), Box<dyn Error>> {
    let settings = Settings::load()?;
    logging::init_with_config(&settings.logging);

    let dataset = load_dataset(&settings.input)?;
    let aggregation = aggregate(&dataset, &settings.allow_list())?;

    info!(
        restaurants = aggregation.index.len(),
        labelled = aggregation.labels.len(),
        edges = aggregation.edges.len(),
        "selected keyword edges"
    );

    let graph = BipartiteGraph::from_edges(&aggregation.edges);
    info!(
        nodes = graph.node_count(),
        edges = graph.edge_count(),
        "laying out graph"
    );
    let layout = spring_layout(&graph, settings.layout.seed, settings.layout.iterations);

    render(&graph, &layout, &settings.render, &settings.output)?;

    Ok(())
}
