//! Builders for i3-compatible JSON replies: `get_tree`, `get_workspaces`
//! and `get_outputs`.
//!
//! Outputs and workspaces are not containers in the arena, so their node
//! ids are offset into separate ranges to stay unique within one tree
//! reply.

use crate::compositor::Compositor;
use crate::container::{ContainerId, ContainerKind};
use crate::geometry::Rect;
use crate::output::Output;
use crate::workspace::Workspace;
use serde_json::{json, Value};

const OUTPUT_ID_BASE: u64 = 1 << 40;
const WORKSPACE_ID_BASE: u64 = 1 << 41;

fn rect_json(rect: Rect) -> Value {
    json!({
        "x": rect.x,
        "y": rect.y,
        "width": rect.width,
        "height": rect.height,
    })
}

fn zero_rect_json() -> Value {
    rect_json(Rect::default())
}

fn orientation(scheme: crate::container::LayoutScheme) -> &'static str {
    match scheme {
        crate::container::LayoutScheme::Horizontal => "horizontal",
        crate::container::LayoutScheme::Vertical => "vertical",
        _ => "none",
    }
}

/// One container node, recursively.
pub fn container_json(core: &Compositor, id: ContainerId, workspace_visible: bool) -> Value {
    let Some(node) = core.tree.get(id) else {
        return Value::Null;
    };

    match &node.kind {
        ContainerKind::Parent(parent) => {
            let nodes: Vec<Value> = parent
                .children
                .iter()
                .map(|&child| container_json(core, child, workspace_visible))
                .collect();
            json!({
                "id": node.id().as_u64(),
                "name": Value::Null,
                "type": "con",
                "rect": rect_json(node.logical_area),
                "window_rect": zero_rect_json(),
                "deco_rect": zero_rect_json(),
                "focused": workspace_visible && core.is_focused(id),
                "layout": parent.scheme.i3_name(),
                "orientation": orientation(parent.scheme),
                "fullscreen_mode": 0,
                "sticky": node.pinned,
                "scratchpad_state": node.scratchpad_state,
                "urgent": false,
                "nodes": nodes,
                "floating_nodes": [],
            })
        }
        ContainerKind::Leaf(leaf) => {
            // Children of a tabbed or stacked parent are visible only while
            // focused.
            let stacked_parent = node
                .parent
                .and_then(|parent| core.tree.get(parent))
                .and_then(|parent| parent.as_parent())
                .map(|data| data.scheme.is_stacked_kind())
                .unwrap_or(false);
            let visible = workspace_visible && (!stacked_parent || core.is_focused(id));
            json!({
                "id": node.id().as_u64(),
                "name": leaf.meta.title,
                "type": "con",
                "rect": rect_json(node.effective_area()),
                "window_rect": rect_json(core.tree.visible_area(id, &core.config)),
                "deco_rect": zero_rect_json(),
                "focused": visible && core.is_focused(id),
                "visible": visible,
                "layout": "none",
                "orientation": "none",
                "fullscreen_mode": if core.is_fullscreen(id) { 1 } else { 0 },
                "app_id": leaf.meta.app_id,
                "pid": leaf.meta.pid,
                "sticky": node.pinned,
                "scratchpad_state": node.scratchpad_state,
                "urgent": false,
                "border": "normal",
                "current_border_width": core.config.border.size,
                "nodes": [],
                "floating_nodes": [],
            })
        }
        ContainerKind::Shell(shell) => json!({
            "id": node.id().as_u64(),
            "name": shell.meta.title,
            "type": "con",
            "rect": rect_json(node.logical_area),
            "window_rect": zero_rect_json(),
            "deco_rect": zero_rect_json(),
            "focused": false,
            "layout": "none",
            "orientation": "none",
            "fullscreen_mode": 0,
            "app_id": shell.meta.app_id,
            "pid": shell.meta.pid,
            "sticky": false,
            "scratchpad_state": node.scratchpad_state,
            "urgent": false,
            "nodes": [],
            "floating_nodes": [],
        }),
        ContainerKind::Group(_) => Value::Null,
    }
}

fn workspace_json(core: &Compositor, workspace: &Workspace, output: &Output) -> Value {
    let visible = output.active() == Some(workspace.id());
    let output_focused = core.state.focused_output() == Some(output.id());
    let root_scheme = core
        .tree
        .get(workspace.root)
        .and_then(|node| node.as_parent())
        .map(|parent| parent.scheme)
        .unwrap_or(crate::container::LayoutScheme::Horizontal);

    let nodes: Vec<Value> = core
        .tree
        .children_of(workspace.root)
        .into_iter()
        .map(|child| container_json(core, child, visible))
        .collect();
    let floating_nodes: Vec<Value> = workspace
        .floating
        .iter()
        .map(|&floating| container_json(core, floating, visible))
        .collect();

    json!({
        "id": WORKSPACE_ID_BASE + workspace.id().0 as u64,
        "num": workspace.num().unwrap_or(-1),
        "name": workspace.display_name(),
        "type": "workspace",
        "rect": rect_json(
            core.tree
                .get(workspace.root)
                .map(|node| node.logical_area)
                .unwrap_or_default()
        ),
        "visible": visible,
        "focused": output_focused && visible,
        "urgent": false,
        "output": output.name(),
        "layout": root_scheme.i3_name(),
        "orientation": "none",
        "border": "none",
        "current_border_width": 0,
        "window_rect": zero_rect_json(),
        "deco_rect": zero_rect_json(),
        "nodes": nodes,
        "floating_nodes": floating_nodes,
    })
}

fn output_json_node(core: &Compositor, output: &Output) -> Value {
    let nodes: Vec<Value> = output
        .workspaces
        .iter()
        .filter_map(|id| core.workspaces.get(id))
        .map(|workspace| workspace_json(core, workspace, output))
        .collect();
    json!({
        "id": OUTPUT_ID_BASE + output.id().0 as u64,
        "name": output.name(),
        "type": "output",
        "rect": rect_json(output.area()),
        "active": !output.defunct,
        "primary": core.outputs.first().map(|o| o.id()) == Some(output.id()),
        "focused": core.state.focused_output() == Some(output.id()),
        "layout": "output",
        "orientation": "none",
        "nodes": nodes,
        "floating_nodes": [],
    })
}

/// The full `get_tree` reply: root, outputs, workspaces, containers.
pub fn tree_json(core: &Compositor) -> Value {
    let nodes: Vec<Value> = core
        .outputs
        .iter()
        .map(|output| output_json_node(core, output))
        .collect();

    // Bounding box over every output.
    let rect = core
        .outputs
        .iter()
        .map(|output| output.area())
        .reduce(|a, b| {
            let x = a.x.min(b.x);
            let y = a.y.min(b.y);
            let right = (a.x + a.width).max(b.x + b.width);
            let bottom = (a.y + a.height).max(b.y + b.height);
            Rect::new(x, y, right - x, bottom - y)
        })
        .unwrap_or_default();

    json!({
        "id": 0,
        "name": "root",
        "type": "root",
        "rect": rect_json(rect),
        "focused": false,
        "layout": "splith",
        "orientation": "horizontal",
        "nodes": nodes,
        "floating_nodes": [],
    })
}

/// The `get_workspaces` reply: a flat array in global sorted order.
pub fn workspaces_json(core: &Compositor) -> Value {
    let sorted = crate::workspace::WorkspaceManager::sorted(&core.workspaces);
    let entries: Vec<Value> = sorted
        .iter()
        .filter_map(|id| {
            let workspace = core.workspaces.get(id)?;
            let output = core.output(workspace.output)?;
            let visible = output.active() == Some(workspace.id());
            Some(json!({
                "id": WORKSPACE_ID_BASE + workspace.id().0 as u64,
                "num": workspace.num().unwrap_or(-1),
                "name": workspace.display_name(),
                "visible": visible,
                "focused": core.state.focused_output() == Some(output.id()) && visible,
                "urgent": false,
                "rect": rect_json(
                    core.tree
                        .get(workspace.root)
                        .map(|node| node.logical_area)
                        .unwrap_or_default()
                ),
                "output": output.name(),
            }))
        })
        .collect();
    Value::Array(entries)
}

/// The `get_outputs` reply.
pub fn outputs_json(core: &Compositor) -> Value {
    let entries: Vec<Value> = core
        .outputs
        .iter()
        .map(|output| {
            let current = output
                .active()
                .and_then(|id| core.workspaces.get(&id))
                .map(|workspace| workspace.display_name());
            json!({
                "name": output.name(),
                "active": !output.defunct,
                "primary": core.outputs.first().map(|o| o.id()) == Some(output.id()),
                "rect": rect_json(output.area()),
                "current_workspace": current,
            })
        })
        .collect();
    Value::Array(entries)
}
