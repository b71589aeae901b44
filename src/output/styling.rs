use console::style;

/// Styling helpers for terminal output
pub fn bright_yellow(text: impl std::fmt::Display) -> console::StyledObject<String> {
    style(text.to_string()).bright().yellow()
}

pub fn bright_green(text: impl std::fmt::Display) -> console::StyledObject<String> {
    style(text.to_string()).bright().green()
}

pub fn bright_red(text: impl std::fmt::Display) -> console::StyledObject<String> {
    style(text.to_string()).bright().red()
}

pub fn cyan(text: impl std::fmt::Display) -> console::StyledObject<String> {
    style(text.to_string()).cyan()
}

pub fn dim(text: impl std::fmt::Display) -> console::StyledObject<String> {
    style(text.to_string()).dim()
}

pub fn bright(text: impl std::fmt::Display) -> console::StyledObject<String> {
    style(text.to_string()).bright()
}

/// Color a pipeline, job or merge request state by how it turned out.
pub fn status(text: &str) -> console::StyledObject<String> {
    match text {
        "success" | "merged" | "opened" => bright_green(text),
        "failed" | "closed" | "locked" => bright_red(text),
        "running" | "pending" | "created" | "preparing" | "waiting_for_resource" => {
            bright_yellow(text)
        }
        _ => dim(text),
    }
}
