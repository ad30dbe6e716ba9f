//! Executes parsed IPC command strings against the command controller.
//!
//! Each command in the string is dispatched in order; the first failure
//! aborts the rest and its result is what the client sees. Distances accept
//! a `px` suffix (or nothing) for pixels and `ppt` for a percentage of the
//! focused output's axis.

use super::command::{
    IpcCommand, IpcCommandParser, IpcCommandType, IpcParseResult, IpcScope, IpcScopeType,
};
use crate::container::LayoutScheme;
use crate::controller::{CommandController, OutputSelector};
use crate::error::CoreError;
use crate::geometry::Direction;
use crate::workspace::WorkspaceKey;
use regex::Regex;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info};

/// Outcome of one command, serialized onto the socket.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct IpcValidationResult {
    pub success: bool,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub parse_error: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl IpcValidationResult {
    pub fn ok() -> Self {
        IpcValidationResult {
            success: true,
            parse_error: false,
            error: None,
        }
    }

    pub fn parse_error(message: impl Into<String>) -> Self {
        IpcValidationResult {
            success: false,
            parse_error: true,
            error: Some(message.into()),
        }
    }

    pub fn execution_error(message: impl Into<String>) -> Self {
        IpcValidationResult {
            success: false,
            parse_error: false,
            error: Some(message.into()),
        }
    }

    fn from_bool(success: bool, what: &str) -> Self {
        if success {
            IpcValidationResult::ok()
        } else {
            IpcValidationResult::execution_error(format!("{what}: rejected"))
        }
    }
}

impl From<CoreError> for IpcValidationResult {
    fn from(err: CoreError) -> Self {
        IpcValidationResult {
            success: false,
            parse_error: matches!(err, CoreError::ParseError(_)),
            error: Some(err.to_string()),
        }
    }
}

/// Hook used by `exec`; application launching itself is outside the core.
pub type ExecHook = Arc<dyn Fn(&[String]) + Send + Sync>;

pub struct IpcCommandExecutor {
    controller: CommandController,
    exec_hook: Option<ExecHook>,
}

/// Cursor over a command's argument list.
struct ArgumentsIndexer<'a> {
    arguments: &'a [String],
    index: usize,
}

impl<'a> ArgumentsIndexer<'a> {
    fn new(command: &'a IpcCommand) -> Self {
        ArgumentsIndexer {
            arguments: &command.arguments,
            index: 0,
        }
    }

    fn current(&self) -> Option<&'a str> {
        self.arguments.get(self.index).map(String::as_str)
    }

    fn next(&mut self) -> Option<&'a str> {
        self.index += 1;
        self.current()
    }

    /// Parse a distance at the cursor: `<n>`, `<n> px` or `<n> ppt`
    /// (percent of `available`). Leaves the cursor on the last token
    /// consumed.
    fn parse_distance(&mut self, available: i32) -> Option<i32> {
        let value: i32 = self.current()?.parse().ok()?;
        match self.arguments.get(self.index + 1).map(String::as_str) {
            Some("ppt") => {
                self.index += 1;
                Some(((value as f32 / 100.0) * available as f32) as i32)
            }
            Some("px") => {
                self.index += 1;
                Some(value)
            }
            _ => Some(value),
        }
    }
}

fn direction_from(arg: &str) -> Option<Direction> {
    Some(match arg {
        "left" => Direction::Left,
        "right" => Direction::Right,
        "up" => Direction::Up,
        "down" => Direction::Down,
        _ => return None,
    })
}

impl IpcCommandExecutor {
    pub fn new(controller: CommandController) -> Self {
        IpcCommandExecutor {
            controller,
            exec_hook: None,
        }
    }

    pub fn with_exec_hook(mut self, hook: ExecHook) -> Self {
        self.exec_hook = Some(hook);
        self
    }

    /// Parse and run a full command string. Execution stops at the first
    /// failing command; its result is the last element returned.
    pub fn run(&self, input: &str) -> Vec<IpcValidationResult> {
        let parsed = IpcCommandParser::new(input).parse();
        self.process(&parsed)
    }

    pub fn process(&self, parsed: &IpcParseResult) -> Vec<IpcValidationResult> {
        let mut results = Vec::new();

        if !parsed.scope.is_empty() {
            if let Err(err) = self.focus_scope(&parsed.scope) {
                results.push(err.into());
                return results;
            }
        }

        for command in &parsed.commands {
            let result = self.dispatch(command);
            let failed = !result.success;
            results.push(result);
            if failed {
                break;
            }
        }

        if results.is_empty() {
            results.push(IpcValidationResult::execution_error("no command provided"));
        }
        results
    }

    /// Focus the first container matching every criterion in the scope.
    fn focus_scope(&self, scope: &[IpcScope]) -> Result<(), CoreError> {
        let mut regexes = Vec::new();
        for criterion in scope {
            let regex = match criterion.scope_type {
                IpcScopeType::Class
                | IpcScopeType::Instance
                | IpcScopeType::Title
                | IpcScopeType::WindowRole
                | IpcScopeType::Workspace => match Regex::new(&criterion.value) {
                    Ok(regex) => Some(regex),
                    Err(err) => {
                        return Err(CoreError::ParseError(format!(
                            "bad criteria pattern {:?}: {err}",
                            criterion.value
                        )))
                    }
                },
                _ => None,
            };
            regexes.push(regex);
        }

        let found = self.controller.with(|core| {
            let candidates: Vec<_> = core
                .tree
                .ids()
                .into_iter()
                .filter(|&id| core.tree.get(id).map(|n| n.is_leaf()).unwrap_or(false))
                .collect();

            'candidates: for id in candidates {
                let node = match core.tree.get(id) {
                    Some(node) => node,
                    None => continue,
                };
                let leaf = match node.as_leaf() {
                    Some(leaf) => leaf,
                    None => continue,
                };
                for (criterion, regex) in scope.iter().zip(&regexes) {
                    let matched = match criterion.scope_type {
                        IpcScopeType::All => true,
                        IpcScopeType::Class | IpcScopeType::Instance => regex
                            .as_ref()
                            .map(|r| r.is_match(&leaf.meta.app_id))
                            .unwrap_or(false),
                        IpcScopeType::Title | IpcScopeType::WindowRole => regex
                            .as_ref()
                            .map(|r| r.is_match(&leaf.meta.title))
                            .unwrap_or(false),
                        IpcScopeType::Workspace => node
                            .workspace
                            .and_then(|ws| core.workspaces.get(&ws))
                            .map(|ws| {
                                regex
                                    .as_ref()
                                    .map(|r| r.is_match(&ws.display_name()))
                                    .unwrap_or(false)
                            })
                            .unwrap_or(false),
                        IpcScopeType::Id => criterion
                            .value
                            .parse::<u64>()
                            .map(|raw| node.id().as_u64() == raw)
                            .unwrap_or(false),
                        IpcScopeType::Floating => !node.anchored,
                        IpcScopeType::Tiling => node.anchored,
                        // No urgency or remote-host tracking in this core.
                        IpcScopeType::Urgent | IpcScopeType::Machine => false,
                    };
                    if !matched {
                        continue 'candidates;
                    }
                }
                return Some(id);
            }
            None
        });

        match found {
            Some(id) => {
                self.controller.with(|core| {
                    let window = core.tree.get(id).and_then(|node| node.window());
                    core.select_active_window(window);
                });
                Ok(())
            }
            None => Err(CoreError::NotFound(
                "no window matches the criteria".to_string(),
            )),
        }
    }

    fn dispatch(&self, command: &IpcCommand) -> IpcValidationResult {
        match command.command_type {
            IpcCommandType::Exec => self.process_exec(command),
            IpcCommandType::Split => self.process_split(command),
            IpcCommandType::Layout => self.process_layout(command),
            IpcCommandType::Focus => self.process_focus(command),
            IpcCommandType::Move => self.process_move(command),
            IpcCommandType::Sticky => self.process_sticky(command),
            IpcCommandType::Workspace => self.process_workspace(command),
            IpcCommandType::Scratchpad => self.process_scratchpad(command),
            IpcCommandType::Resize => self.process_resize(command),
            IpcCommandType::Gaps => self.process_gaps(command),
            IpcCommandType::Reload => {
                IpcValidationResult::from_bool(self.controller.reload_config(), "reload")
            }
            IpcCommandType::Exit => {
                self.controller.quit();
                IpcValidationResult::ok()
            }
            IpcCommandType::Nop => IpcValidationResult::ok(),
            IpcCommandType::Swap
            | IpcCommandType::Mark
            | IpcCommandType::Border
            | IpcCommandType::Input => IpcValidationResult::execution_error(format!(
                "unsupported command type: {:?}",
                command.command_type
            )),
            IpcCommandType::None => {
                IpcValidationResult::parse_error("unrecognized command")
            }
        }
    }

    fn process_exec(&self, command: &IpcCommand) -> IpcValidationResult {
        if command.arguments.is_empty() {
            return IpcValidationResult::parse_error("exec: missing command line");
        }
        match &self.exec_hook {
            Some(hook) => {
                hook(&command.arguments);
                IpcValidationResult::ok()
            }
            None => {
                info!(arguments = ?command.arguments, "exec requested with no launcher wired");
                IpcValidationResult::ok()
            }
        }
    }

    fn process_split(&self, command: &IpcCommand) -> IpcValidationResult {
        match command.arguments.first().map(String::as_str) {
            Some("vertical") | Some("v") => {
                IpcValidationResult::from_bool(self.controller.try_request_vertical(), "split")
            }
            Some("horizontal") | Some("h") => {
                IpcValidationResult::from_bool(self.controller.try_request_horizontal(), "split")
            }
            Some("toggle") | Some("t") => {
                IpcValidationResult::from_bool(self.controller.try_toggle_layout(false), "split")
            }
            other => IpcValidationResult::parse_error(format!(
                "split: unknown argument {other:?}"
            )),
        }
    }

    fn process_layout(&self, command: &IpcCommand) -> IpcValidationResult {
        let mut indexer = ArgumentsIndexer::new(command);
        let result = match indexer.current() {
            Some("splith") => self.controller.try_set_layout(LayoutScheme::Horizontal),
            Some("splitv") => self.controller.try_set_layout(LayoutScheme::Vertical),
            Some("tabbed") => self.controller.try_set_layout(LayoutScheme::Tabbing),
            Some("stacking") | Some("stacked") => {
                self.controller.try_set_layout(LayoutScheme::Stacking)
            }
            Some("toggle") => match indexer.next() {
                Some("all") => self.controller.try_toggle_layout(true),
                Some("split") | None => self.controller.try_toggle_layout(false),
                Some(other) => {
                    return IpcValidationResult::parse_error(format!(
                        "layout toggle: unknown argument {other:?}"
                    ))
                }
            },
            other => {
                return IpcValidationResult::parse_error(format!(
                    "layout: unknown argument {other:?}"
                ))
            }
        };
        IpcValidationResult::from_bool(result, "layout")
    }

    fn process_focus(&self, command: &IpcCommand) -> IpcValidationResult {
        let Some(arg) = command.arguments.first().map(String::as_str) else {
            return IpcValidationResult::parse_error("focus: missing argument");
        };
        let result = if let Some(direction) = direction_from(arg) {
            self.controller.try_select(direction)
        } else {
            match arg {
                "parent" => self.controller.try_select_parent(),
                "child" => self.controller.try_select_child(),
                "floating" => self.controller.try_select_floating(),
                "tiling" => self.controller.try_select_tiling(),
                "mode_toggle" => {
                    let floating_focused = self.controller.with(|core| {
                        core.focused_container()
                            .and_then(|id| core.tree.get(id))
                            .map(|node| !node.anchored)
                            .unwrap_or(false)
                    });
                    if floating_focused {
                        self.controller.try_select_tiling()
                    } else {
                        self.controller.try_select_floating()
                    }
                }
                other => {
                    return IpcValidationResult::parse_error(format!(
                        "focus: unknown argument {other:?}"
                    ))
                }
            }
        };
        IpcValidationResult::from_bool(result, "focus")
    }

    fn process_move(&self, command: &IpcCommand) -> IpcValidationResult {
        let mut indexer = ArgumentsIndexer::new(command);
        let Some(first) = indexer.current() else {
            return IpcValidationResult::parse_error("move: missing argument");
        };

        if let Some(direction) = direction_from(first) {
            if indexer.next().is_some() {
                let available = self.controller.focused_output_axis(direction).unwrap_or(0);
                let Some(distance) = indexer.parse_distance(available) else {
                    return IpcValidationResult::parse_error("move: bad distance");
                };
                return IpcValidationResult::from_bool(
                    self.controller.try_move_by(direction, distance),
                    "move",
                );
            }
            return IpcValidationResult::from_bool(self.controller.try_move(direction), "move");
        }

        match first {
            "scratchpad" => {
                IpcValidationResult::from_bool(self.controller.move_to_scratchpad(), "move")
            }
            "position" => {
                let Some(x) = indexer.next().and_then(|arg| arg.parse::<i32>().ok()) else {
                    return IpcValidationResult::parse_error("move position: bad x");
                };
                let mut next = indexer.next();
                if next == Some("px") {
                    next = indexer.next();
                }
                let Some(y) = next.and_then(|arg| arg.parse::<i32>().ok()) else {
                    return IpcValidationResult::parse_error("move position: bad y");
                };
                IpcValidationResult::from_bool(self.controller.try_move_to(x, y), "move")
            }
            "container" | "window" | "to" => {
                // `move [container|window] to workspace ...` and
                // `move [container|window] to output ...`
                let mut token = first;
                if token != "to" {
                    match indexer.next() {
                        Some("to") => {}
                        other => {
                            return IpcValidationResult::parse_error(format!(
                                "move: expected 'to', got {other:?}"
                            ))
                        }
                    }
                }
                token = match indexer.next() {
                    Some(token) => token,
                    None => return IpcValidationResult::parse_error("move to: missing target"),
                };
                match token {
                    "workspace" => self.process_move_to_workspace(&mut indexer),
                    "output" => self.process_move_to_output(&mut indexer),
                    other => IpcValidationResult::parse_error(format!(
                        "move to: unknown target {other:?}"
                    )),
                }
            }
            other => IpcValidationResult::parse_error(format!("move: unknown argument {other:?}")),
        }
    }

    fn process_move_to_workspace(&self, indexer: &mut ArgumentsIndexer<'_>) -> IpcValidationResult {
        let Some(target) = indexer.next() else {
            return IpcValidationResult::parse_error("move to workspace: missing name");
        };
        let result = match target {
            "next" => self.controller.move_active_to_next_workspace(),
            "prev" => self.controller.move_active_to_prev_workspace(),
            "back_and_forth" => self.controller.move_active_to_back_and_forth(),
            "number" => {
                let Some(num) = indexer.next().and_then(|arg| arg.parse::<i32>().ok()) else {
                    return IpcValidationResult::parse_error("move to workspace number: bad number");
                };
                self.controller
                    .move_active_to_workspace(WorkspaceKey::Num(num), true)
            }
            name => {
                let key = match name.parse::<i32>() {
                    Ok(num) => WorkspaceKey::Num(num),
                    Err(_) => WorkspaceKey::Name(name.to_string()),
                };
                self.controller.move_active_to_workspace(key, true)
            }
        };
        IpcValidationResult::from_bool(result, "move to workspace")
    }

    fn process_move_to_output(&self, indexer: &mut ArgumentsIndexer<'_>) -> IpcValidationResult {
        let Some(target) = indexer.next() else {
            return IpcValidationResult::parse_error("move to output: missing target");
        };
        let selector = if let Some(direction) = direction_from(target) {
            OutputSelector::Direction(direction)
        } else {
            match target {
                "next" => OutputSelector::Next,
                "prev" => OutputSelector::Prev,
                "primary" => OutputSelector::Primary,
                "nonprimary" => OutputSelector::NonPrimary,
                name => {
                    let mut names = vec![name.to_string()];
                    while let Some(more) = indexer.next() {
                        names.push(more.to_string());
                    }
                    OutputSelector::Names(names)
                }
            }
        };
        IpcValidationResult::from_bool(
            self.controller.try_move_active_to_output(selector),
            "move to output",
        )
    }

    fn process_sticky(&self, command: &IpcCommand) -> IpcValidationResult {
        let result = match command.arguments.first().map(String::as_str) {
            Some("enable") => self.controller.try_set_pinned(true),
            Some("disable") => self.controller.try_set_pinned(false),
            Some("toggle") => self.controller.try_toggle_pinned(),
            other => {
                return IpcValidationResult::parse_error(format!(
                    "sticky: unknown argument {other:?}"
                ))
            }
        };
        IpcValidationResult::from_bool(result, "sticky")
    }

    fn process_workspace(&self, command: &IpcCommand) -> IpcValidationResult {
        let back_and_forth = !command
            .options
            .iter()
            .any(|option| option == "--no-auto-back-and-forth");
        let mut indexer = ArgumentsIndexer::new(command);
        let Some(target) = indexer.current() else {
            return IpcValidationResult::parse_error("workspace: missing argument");
        };
        let result = match target {
            "next" => self.controller.next_workspace(),
            "prev" => self.controller.prev_workspace(),
            "back_and_forth" => self.controller.back_and_forth_workspace(),
            "next_on_output" => self.controller.next_workspace_on_output(),
            "prev_on_output" => self.controller.prev_workspace_on_output(),
            "number" => {
                let Some(num) = indexer.next().and_then(|arg| arg.parse::<i32>().ok()) else {
                    return IpcValidationResult::parse_error("workspace number: bad number");
                };
                self.controller
                    .select_workspace(WorkspaceKey::Num(num), back_and_forth)
            }
            name => {
                let key = match name.parse::<i32>() {
                    Ok(num) => WorkspaceKey::Num(num),
                    Err(_) => WorkspaceKey::Name(name.to_string()),
                };
                self.controller.select_workspace(key, back_and_forth)
            }
        };
        IpcValidationResult::from_bool(result, "workspace")
    }

    fn process_scratchpad(&self, command: &IpcCommand) -> IpcValidationResult {
        match command.arguments.first().map(String::as_str) {
            Some("show") => {
                IpcValidationResult::from_bool(self.controller.show_scratchpad(), "scratchpad")
            }
            other => IpcValidationResult::parse_error(format!(
                "scratchpad: unknown argument {other:?}"
            )),
        }
    }

    fn process_resize(&self, command: &IpcCommand) -> IpcValidationResult {
        let mut indexer = ArgumentsIndexer::new(command);
        match indexer.current() {
            Some("grow") => self.process_resize_adjust(&mut indexer, 1),
            Some("shrink") => self.process_resize_adjust(&mut indexer, -1),
            Some("set") => self.process_resize_set(&mut indexer),
            other => IpcValidationResult::parse_error(format!(
                "resize: unexpected argument {other:?}"
            )),
        }
    }

    fn process_resize_adjust(
        &self,
        indexer: &mut ArgumentsIndexer<'_>,
        multiplier: i32,
    ) -> IpcValidationResult {
        let Some(axis) = indexer.next() else {
            return IpcValidationResult::parse_error("resize: expected an axis or direction");
        };
        let direction = match axis {
            "width" | "horizontal" => Direction::Right,
            "height" | "vertical" => Direction::Down,
            other => match direction_from(other) {
                Some(direction) => direction,
                None => {
                    return IpcValidationResult::parse_error(format!(
                        "resize: unknown direction {other:?}"
                    ))
                }
            },
        };

        let available = self.controller.focused_output_axis(direction).unwrap_or(0);
        let amount = match indexer.next() {
            Some(_) => match indexer.parse_distance(available) {
                Some(amount) => amount,
                None => return IpcValidationResult::parse_error("resize: bad distance"),
            },
            // i3 defaults to 10px when no distance is given.
            None => 10,
        };

        IpcValidationResult::from_bool(
            self.controller.try_resize(direction, amount * multiplier),
            "resize",
        )
    }

    fn process_resize_set(&self, indexer: &mut ArgumentsIndexer<'_>) -> IpcValidationResult {
        let mut width = None;
        let mut height = None;
        let mut axis_hint: Option<&str> = None;

        while let Some(token) = indexer.next() {
            match token {
                "width" | "height" => axis_hint = Some(token),
                "px" | "ppt" => {}
                number => {
                    let Ok(value) = number.parse::<i32>() else {
                        return IpcValidationResult::parse_error(format!(
                            "resize set: bad value {number:?}"
                        ));
                    };
                    match axis_hint {
                        Some("width") => width = Some(value),
                        Some("height") => height = Some(value),
                        _ => {
                            // Bare pair: first number is width, second height.
                            if width.is_none() {
                                width = Some(value);
                            } else {
                                height = Some(value);
                            }
                        }
                    }
                    axis_hint = None;
                }
            }
        }

        if width.is_none() && height.is_none() {
            return IpcValidationResult::parse_error("resize set: no dimensions given");
        }
        IpcValidationResult::from_bool(self.controller.try_set_size(width, height), "resize set")
    }

    fn process_gaps(&self, command: &IpcCommand) -> IpcValidationResult {
        // Accepted shapes: `gaps inner all set 10`, `gaps inner 10`.
        let value = command
            .arguments
            .iter()
            .rev()
            .find_map(|arg| arg.parse::<i32>().ok());
        let Some(value) = value else {
            return IpcValidationResult::parse_error("gaps: missing pixel value");
        };
        match command.arguments.first().map(String::as_str) {
            Some("inner") => {
                IpcValidationResult::from_bool(self.controller.set_inner_gaps(value), "gaps")
            }
            Some(other) => {
                debug!("gaps: ignoring unsupported scope {other:?}");
                IpcValidationResult::ok()
            }
            None => IpcValidationResult::parse_error("gaps: missing arguments"),
        }
    }
}
