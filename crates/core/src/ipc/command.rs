//! Tokenizer for i3-style command strings.
//!
//! A command string is `[scope] command [--options] [arguments] ; ...`:
//! `[` opens a criteria scope, `=` separates a scope key from its value,
//! `"` delimits literals (preserving whitespace), `;` separates commands
//! and space is the generic delimiter. The parser is a seven-state machine
//! over a state stack, which keeps literal handling uniform across scope
//! keys, scope values and arguments.

use serde::Serialize;
use tracing::error;

/// Command verbs the parser recognizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IpcCommandType {
    None,
    Exec,
    Split,
    Layout,
    Focus,
    Move,
    Swap,
    Sticky,
    Workspace,
    Mark,
    Border,
    Reload,
    Exit,
    Scratchpad,
    Gaps,
    Input,
    Resize,
    Nop,
}

fn command_from_string(s: &str) -> IpcCommandType {
    match s {
        "exec" => IpcCommandType::Exec,
        "split" => IpcCommandType::Split,
        "layout" => IpcCommandType::Layout,
        "focus" => IpcCommandType::Focus,
        "move" => IpcCommandType::Move,
        "swap" => IpcCommandType::Swap,
        "sticky" => IpcCommandType::Sticky,
        "workspace" => IpcCommandType::Workspace,
        "mark" => IpcCommandType::Mark,
        "border" => IpcCommandType::Border,
        "reload" => IpcCommandType::Reload,
        "exit" => IpcCommandType::Exit,
        "scratchpad" => IpcCommandType::Scratchpad,
        "gaps" => IpcCommandType::Gaps,
        "input" => IpcCommandType::Input,
        "resize" => IpcCommandType::Resize,
        "nop" => IpcCommandType::Nop,
        other => {
            error!("invalid i3 command type: {other}");
            IpcCommandType::None
        }
    }
}

/// Criteria keys usable inside a `[...]` scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IpcScopeType {
    All,
    Class,
    Instance,
    WindowRole,
    Machine,
    Id,
    Title,
    Urgent,
    Workspace,
    Floating,
    Tiling,
}

fn scope_from_string(s: &str) -> IpcScopeType {
    match s {
        "class" => IpcScopeType::Class,
        "instance" => IpcScopeType::Instance,
        "window_role" => IpcScopeType::WindowRole,
        "machine" => IpcScopeType::Machine,
        "id" => IpcScopeType::Id,
        "title" => IpcScopeType::Title,
        "urgent" => IpcScopeType::Urgent,
        "workspace" => IpcScopeType::Workspace,
        "floating" => IpcScopeType::Floating,
        "tiling" => IpcScopeType::Tiling,
        _ => IpcScopeType::All,
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IpcScope {
    pub scope_type: IpcScopeType,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IpcCommand {
    pub command_type: IpcCommandType,
    pub options: Vec<String>,
    pub arguments: Vec<String>,
}

impl IpcCommand {
    fn new(command_type: IpcCommandType) -> Self {
        IpcCommand {
            command_type,
            options: Vec::new(),
            arguments: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IpcParseResult {
    pub scope: Vec<IpcScope>,
    pub commands: Vec<IpcCommand>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ParseState {
    Root,
    ScopeKey,
    ScopeValue,
    Literal,
    Command,
    Option,
    Argument,
}

const COMMAND_DELIM: char = ' ';
const INTER_COMMAND_DELIM: char = ';';
const SCOPE_OPEN: char = '[';
const SCOPE_CLOSE: char = ']';
const SCOPE_EQUALS: char = '=';
const LITERAL_DELIM: char = '"';

pub struct IpcCommandParser {
    data: Vec<char>,
    stack: Vec<ParseState>,
    has_parsed_command: bool,
    can_parse_options: bool,
}

impl IpcCommandParser {
    pub fn new(data: &str) -> Self {
        IpcCommandParser {
            data: data.chars().collect(),
            stack: vec![ParseState::Root],
            has_parsed_command: false,
            can_parse_options: true,
        }
    }

    pub fn parse(mut self) -> IpcParseResult {
        let mut result = IpcParseResult::default();
        let mut buffer = String::new();

        for index in 0..self.data.len() {
            let c = self.data[index];
            match *self.stack.last().unwrap_or(&ParseState::Root) {
                ParseState::Root => {
                    if c == SCOPE_OPEN {
                        self.stack.push(ParseState::ScopeKey);
                        continue;
                    }
                    if c == COMMAND_DELIM {
                        continue;
                    }

                    if !self.has_parsed_command {
                        self.stack.push(ParseState::Command);
                    } else if self.can_parse_options
                        && index + 2 < self.data.len()
                        && self.data[index] == '-'
                        && self.data[index + 1] == '-'
                    {
                        self.stack.push(ParseState::Option);
                    } else {
                        self.can_parse_options = false;
                        self.stack.push(ParseState::Argument);
                    }

                    if c == LITERAL_DELIM {
                        self.stack.push(ParseState::Literal);
                    } else {
                        buffer.push(c);
                    }
                }
                ParseState::ScopeKey => {
                    if c == SCOPE_CLOSE {
                        if !buffer.is_empty() {
                            result.scope.push(IpcScope {
                                scope_type: scope_from_string(&buffer),
                                value: String::new(),
                            });
                            buffer.clear();
                        }
                        self.stack.pop();
                    } else if c == LITERAL_DELIM {
                        self.stack.push(ParseState::Literal);
                    } else if c == SCOPE_EQUALS {
                        if buffer.is_empty() {
                            self.stack.pop();
                            continue;
                        }
                        result.scope.push(IpcScope {
                            scope_type: scope_from_string(&buffer),
                            value: String::new(),
                        });
                        buffer.clear();
                        self.stack.pop();
                        self.stack.push(ParseState::ScopeValue);
                    } else if c == COMMAND_DELIM {
                        // Whitespace between scope entries.
                    } else {
                        buffer.push(c);
                    }
                }
                ParseState::ScopeValue => {
                    if c == SCOPE_CLOSE || c == COMMAND_DELIM {
                        if let Some(scope) = result.scope.last_mut() {
                            scope.value = std::mem::take(&mut buffer);
                        }
                        self.stack.pop();
                        if c == COMMAND_DELIM {
                            self.stack.push(ParseState::ScopeKey);
                        }
                    } else if c == LITERAL_DELIM {
                        self.stack.push(ParseState::Literal);
                    } else {
                        buffer.push(c);
                    }
                }
                ParseState::Literal => {
                    if c == LITERAL_DELIM {
                        self.stack.pop();
                    } else {
                        buffer.push(c);
                    }
                }
                ParseState::Command => {
                    if c == COMMAND_DELIM || c == INTER_COMMAND_DELIM {
                        // Stray delimiters before any token are ignored.
                        if buffer.is_empty() {
                            continue;
                        }
                        result
                            .commands
                            .push(IpcCommand::new(command_from_string(&buffer)));
                        buffer.clear();
                        self.stack.pop();
                        self.can_parse_options = true;
                        self.has_parsed_command = c != INTER_COMMAND_DELIM;
                    } else {
                        buffer.push(c);
                    }
                }
                ParseState::Option => {
                    if c == COMMAND_DELIM || c == INTER_COMMAND_DELIM {
                        if c == COMMAND_DELIM && buffer.is_empty() {
                            continue;
                        }
                        if let Some(command) = result.commands.last_mut() {
                            command.options.push(std::mem::take(&mut buffer));
                        }
                        self.stack.pop();
                        self.has_parsed_command = c != INTER_COMMAND_DELIM;
                    } else {
                        buffer.push(c);
                    }
                }
                ParseState::Argument => {
                    if c == COMMAND_DELIM || c == INTER_COMMAND_DELIM {
                        if buffer.is_empty() {
                            continue;
                        }
                        if let Some(command) = result.commands.last_mut() {
                            command.arguments.push(std::mem::take(&mut buffer));
                        }
                        self.stack.pop();
                        self.has_parsed_command = c != INTER_COMMAND_DELIM;
                    } else {
                        buffer.push(c);
                    }
                }
            }
        }

        // Whatever is left in the buffer belongs to the state on top.
        if !buffer.is_empty() {
            match self.stack.last() {
                Some(ParseState::Option) => {
                    if let Some(command) = result.commands.last_mut() {
                        command.options.push(buffer);
                    }
                }
                Some(ParseState::Argument) => {
                    if let Some(command) = result.commands.last_mut() {
                        command.arguments.push(buffer);
                    }
                }
                Some(ParseState::Command) => {
                    result
                        .commands
                        .push(IpcCommand::new(command_from_string(&buffer)));
                }
                Some(ParseState::ScopeKey) => {
                    result.scope.push(IpcScope {
                        scope_type: scope_from_string(&buffer),
                        value: String::new(),
                    });
                }
                Some(ParseState::ScopeValue) => {
                    if let Some(scope) = result.scope.last_mut() {
                        scope.value = buffer;
                    }
                }
                _ => {}
            }
        }

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(s: &str) -> IpcParseResult {
        IpcCommandParser::new(s).parse()
    }

    #[test]
    fn parses_class_scope() {
        let result = parse("[class=\"XYZ\"]");
        assert_eq!(result.scope[0].scope_type, IpcScopeType::Class);
        assert_eq!(result.scope[0].value, "XYZ");
    }

    #[test]
    fn parses_bare_all_scope() {
        let result = parse("[all]");
        assert_eq!(result.scope[0].scope_type, IpcScopeType::All);
        assert_eq!(result.scope[0].value, "");
    }

    #[test]
    fn parses_multiple_scopes() {
        let result = parse("[class=\"Firefox\" window_role=\"About\"]");
        assert_eq!(result.scope[0].scope_type, IpcScopeType::Class);
        assert_eq!(result.scope[0].value, "Firefox");
        assert_eq!(result.scope[1].scope_type, IpcScopeType::WindowRole);
        assert_eq!(result.scope[1].value, "About");
    }

    #[test]
    fn preserves_regex_literals() {
        let result = parse("[class=\"^(?i)(?!firefox)(?!gnome-terminal).*\"]");
        assert_eq!(result.scope[0].value, "^(?i)(?!firefox)(?!gnome-terminal).*");
    }

    #[test]
    fn parses_tiling_and_floating_scopes() {
        assert_eq!(parse("[tiling]").scope[0].scope_type, IpcScopeType::Tiling);
        assert_eq!(
            parse("[floating ]").scope[0].scope_type,
            IpcScopeType::Floating
        );
    }

    #[test]
    fn parses_single_command() {
        let result = parse("exec gedit");
        assert_eq!(result.commands.len(), 1);
        assert_eq!(result.commands[0].command_type, IpcCommandType::Exec);
        assert_eq!(result.commands[0].arguments, vec!["gedit"]);
    }

    #[test]
    fn parses_options_before_arguments() {
        let result = parse("exec --no-startup-id gedit");
        assert_eq!(result.commands[0].options, vec!["--no-startup-id"]);
        assert_eq!(result.commands[0].arguments, vec!["gedit"]);
    }

    #[test]
    fn parses_split_command() {
        let result = parse("split vertical");
        assert_eq!(result.commands[0].command_type, IpcCommandType::Split);
        assert_eq!(result.commands[0].arguments, vec!["vertical"]);
    }

    #[test]
    fn literal_arguments_keep_internal_characters() {
        let result = parse("workspace  \"1:first\"");
        assert_eq!(result.commands.len(), 1);
        assert_eq!(result.commands[0].command_type, IpcCommandType::Workspace);
        assert_eq!(result.commands[0].arguments, vec!["1:first"]);
    }

    #[test]
    fn semicolons_separate_commands() {
        let result = parse("workspace  \"1:first\"; layout --opt1 splith");
        assert_eq!(result.commands.len(), 2);
        assert_eq!(result.commands[0].command_type, IpcCommandType::Workspace);
        assert_eq!(result.commands[0].arguments, vec!["1:first"]);
        assert_eq!(result.commands[1].command_type, IpcCommandType::Layout);
        assert_eq!(result.commands[1].options, vec!["--opt1"]);
        assert_eq!(result.commands[1].arguments, vec!["splith"]);
    }

    #[test]
    fn parses_three_commands() {
        let result = parse("workspace  \"1:first\"; layout --opt1 splith; layout --opt2 splitv");
        assert_eq!(result.commands.len(), 3);
        assert_eq!(result.commands[2].command_type, IpcCommandType::Layout);
        assert_eq!(result.commands[2].options, vec!["--opt2"]);
        assert_eq!(result.commands[2].arguments, vec!["splitv"]);
    }

    #[test]
    fn unknown_command_becomes_none() {
        let result = parse("frobnicate");
        assert_eq!(result.commands[0].command_type, IpcCommandType::None);
    }

    #[test]
    fn scope_then_command() {
        let result = parse("[title=\"editor\"] focus right");
        assert_eq!(result.scope[0].scope_type, IpcScopeType::Title);
        assert_eq!(result.scope[0].value, "editor");
        assert_eq!(result.commands[0].command_type, IpcCommandType::Focus);
        assert_eq!(result.commands[0].arguments, vec!["right"]);
    }

    #[test]
    fn dashes_inside_arguments_are_not_options() {
        // Options are only recognized directly after the command word.
        let result = parse("exec gedit --new-window");
        assert_eq!(result.commands[0].options, Vec::<String>::new());
        assert_eq!(result.commands[0].arguments, vec!["gedit", "--new-window"]);
    }

    #[test]
    fn resize_with_units() {
        let result = parse("resize grow width 10 px or 10 ppt");
        assert_eq!(result.commands[0].command_type, IpcCommandType::Resize);
        assert_eq!(
            result.commands[0].arguments,
            vec!["grow", "width", "10", "px", "or", "10", "ppt"]
        );
    }
}
