use serde::Serialize;
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use crate::layout::{LevelLayout, Placement};
use crate::model::Diagram;
use crate::validate::Finding;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutDump {
    pub diagram: String,
    pub level: u8,
    pub nodes: Vec<NodeDump>,
    pub edges: Vec<EdgeDump>,
    pub resize_requests: Vec<ResizeDump>,
    pub findings: Vec<Finding>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeDump {
    pub id: String,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub handles: Vec<HandleDump>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HandleDump {
    pub edge: String,
    pub incoming: bool,
    pub placement: String,
    pub point: [f32; 2],
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EdgeDump {
    pub id: String,
    pub mode: String,
    pub points: Vec<[f32; 2]>,
    pub path: String,
    pub label_anchor: [f32; 2],
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResizeDump {
    pub node: String,
    pub width: f32,
    pub height: f32,
}

impl LayoutDump {
    pub fn from_layout(diagram: &Diagram, layout: &LevelLayout, findings: Vec<Finding>) -> Self {
        let nodes = layout
            .handles
            .iter()
            .filter_map(|(id, handles)| {
                let node = diagram.node_at(id, layout.level)?;
                let (width, height) = node.size();
                Some(NodeDump {
                    id: id.clone(),
                    x: node.position.x,
                    y: node.position.y,
                    width,
                    height,
                    handles: handles
                        .spots
                        .iter()
                        .map(|spot| HandleDump {
                            edge: spot.edge.clone(),
                            incoming: spot.incoming,
                            placement: match spot.placement {
                                Placement::Rect { side, offset } => {
                                    format!("{side:?} {offset:.1}%")
                                }
                                Placement::Circle { angle_deg } => format!("{angle_deg:.1}deg"),
                            },
                            point: [spot.point.0, spot.point.1],
                        })
                        .collect(),
                })
            })
            .collect();

        let edges = layout
            .edges
            .iter()
            .map(|edge| EdgeDump {
                id: edge.id.clone(),
                mode: format!("{:?}", edge.mode),
                points: edge.points.iter().map(|&(x, y)| [x, y]).collect(),
                path: edge.path.clone(),
                label_anchor: [edge.label_anchor.0, edge.label_anchor.1],
            })
            .collect();

        let resize_requests = layout
            .resize_requests
            .iter()
            .map(|request| ResizeDump {
                node: request.node.clone(),
                width: request.width,
                height: request.height,
            })
            .collect();

        LayoutDump {
            diagram: diagram.id.clone(),
            level: layout.level.into(),
            nodes,
            edges,
            resize_requests,
            findings,
        }
    }
}

pub fn write_layout_dump(
    path: &Path,
    diagram: &Diagram,
    layout: &LevelLayout,
    findings: Vec<Finding>,
) -> anyhow::Result<()> {
    let file = File::create(path)?;
    let writer = BufWriter::new(file);
    let dump = LayoutDump::from_layout(diagram, layout, findings);
    serde_json::to_writer_pretty(writer, &dump)?;
    Ok(())
}
