use comfy_table::modifiers::UTF8_ROUND_CORNERS;
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Cell, Color as TableColor, ContentArrangement, Table};

use crate::gitlab::types::{Job, Label, MergeRequest, Pipeline, Release, Snippet};

use super::render::{format_duration, format_time, short_sha};

/// Table and cell creation helpers
pub fn create_table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table
}

fn create_cyan_header(labels: &[&str]) -> Vec<Cell> {
    labels
        .iter()
        .map(|label| Cell::new(*label).fg(TableColor::Cyan))
        .collect()
}

pub fn status_cell(status: &str) -> Cell {
    let color = match status {
        "success" | "merged" | "opened" => TableColor::Green,
        "failed" | "closed" | "locked" => TableColor::Red,
        "running" | "pending" | "created" | "preparing" | "waiting_for_resource" => {
            TableColor::Yellow
        }
        _ => TableColor::DarkGrey,
    };
    Cell::new(status).fg(color)
}

/// Job duration, green under 10 minutes, yellow under 15, red beyond.
pub fn color_coded_duration_cell(seconds: Option<f64>) -> Cell {
    let Some(seconds) = seconds else {
        return Cell::new("-");
    };
    let text = format_duration(seconds);
    let minutes = seconds / 60.0;
    if minutes <= 10.0 {
        Cell::new(text).fg(TableColor::Green)
    } else if minutes <= 15.0 {
        Cell::new(text).fg(TableColor::Yellow)
    } else {
        Cell::new(text).fg(TableColor::Red)
    }
}

pub fn pipelines_table(pipelines: &[Pipeline]) -> Table {
    let mut table = create_table();
    table.set_header(create_cyan_header(&[
        "ID", "Status", "Ref", "Commit", "Source", "Created",
    ]));
    for pipeline in pipelines {
        table.add_row(vec![
            Cell::new(pipeline.id),
            status_cell(&pipeline.status),
            Cell::new(&pipeline.ref_),
            Cell::new(short_sha(&pipeline.sha)),
            Cell::new(pipeline.source.as_deref().unwrap_or("-")),
            Cell::new(format_time(&pipeline.created_at)),
        ]);
    }
    table
}

/// Jobs in the order given; callers sort them by stage first.
pub fn jobs_table(jobs: &[&Job]) -> Table {
    let mut table = create_table();
    table.set_header(create_cyan_header(&[
        "Stage", "Job", "ID", "Status", "Duration",
    ]));
    for job in jobs {
        let name = if job.allow_failure {
            format!("{} (allowed to fail)", job.name)
        } else {
            job.name.clone()
        };
        table.add_row(vec![
            Cell::new(&job.stage),
            Cell::new(name),
            Cell::new(job.id),
            status_cell(&job.status),
            color_coded_duration_cell(job.duration),
        ]);
    }
    table
}

pub fn merge_requests_table(merge_requests: &[MergeRequest]) -> Table {
    let mut table = create_table();
    table.set_header(create_cyan_header(&[
        "IID", "Title", "State", "Branches", "Author", "Updated",
    ]));
    for mr in merge_requests {
        table.add_row(vec![
            Cell::new(format!("!{}", mr.iid)),
            Cell::new(&mr.title),
            status_cell(&mr.state),
            Cell::new(format!("{} → {}", mr.source_branch, mr.target_branch)),
            Cell::new(format!("@{}", mr.author.username)),
            Cell::new(format_time(&mr.updated_at)),
        ]);
    }
    table
}

pub fn releases_table(releases: &[Release]) -> Table {
    let mut table = create_table();
    table.set_header(create_cyan_header(&["Tag", "Name", "Released", "Assets"]));
    for release in releases {
        let released = release.released_at.unwrap_or(release.created_at);
        table.add_row(vec![
            Cell::new(&release.tag_name),
            Cell::new(release.name.as_deref().unwrap_or("")),
            Cell::new(format_time(&released)),
            Cell::new(release.assets.links.len()),
        ]);
    }
    table
}

pub fn labels_table(labels: &[Label]) -> Table {
    let mut table = create_table();
    table.set_header(create_cyan_header(&[
        "Name", "Color", "Priority", "Open MRs", "Open issues", "Description",
    ]));
    for label in labels {
        table.add_row(vec![
            Cell::new(&label.name),
            Cell::new(&label.color),
            Cell::new(label.priority.map_or("-".to_string(), |p| p.to_string())),
            Cell::new(label.open_merge_requests_count),
            Cell::new(label.open_issues_count),
            Cell::new(label.description.as_deref().unwrap_or("")),
        ]);
    }
    table
}

pub fn snippets_table(snippets: &[Snippet]) -> Table {
    let mut table = create_table();
    table.set_header(create_cyan_header(&[
        "ID", "Title", "File", "Visibility", "URL",
    ]));
    for snippet in snippets {
        table.add_row(vec![
            Cell::new(snippet.id),
            Cell::new(&snippet.title),
            Cell::new(snippet.file_name.as_deref().unwrap_or("")),
            Cell::new(&snippet.visibility),
            Cell::new(&snippet.web_url),
        ]);
    }
    table
}
