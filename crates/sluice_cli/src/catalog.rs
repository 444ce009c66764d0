//! Catalog listing for `sluice tools`.

use sluice_tool::{Dispatcher, ToolDescription};

/// Filter for the listing
#[derive(Debug, Default, Clone)]
pub struct Filter {
    /// Only this family
    pub family: Option<String>,
    /// Only DANGEROUS operations
    pub dangerous_only: bool,
}

/// One listed operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Line {
    /// Tool family
    pub family: &'static str,
    /// Operation name
    pub name: &'static str,
    /// Gated by the danger switch
    pub dangerous: bool,
    /// One-line summary
    pub summary: &'static str,
}

/// Operations matching `filter`, in registration order
pub fn select(dispatcher: &Dispatcher, filter: &Filter) -> Vec<Line> {
    dispatcher
        .registry()
        .specs()
        .filter(|spec| filter.family.as_deref().is_none_or(|f| f == spec.family))
        .filter(|spec| !filter.dangerous_only || spec.is_dangerous())
        .map(|spec| Line {
            family: spec.family,
            name: spec.name,
            dangerous: spec.is_dangerous(),
            summary: spec.summary,
        })
        .collect()
}

/// Render lines as aligned text, dangerous ones highlighted
pub fn render(lines: &[Line]) -> String {
    let width = lines.iter().map(|l| l.name.len()).max().unwrap_or(0);
    let mut out = String::new();
    for line in lines {
        let danger = if line.dangerous {
            console::style(format!("{:<9}", "dangerous")).red().bold()
        } else {
            console::style(format!("{:<9}", "safe")).green()
        };
        out.push_str(&format!(
            "{:<5} {:<width$} {} {}\n",
            line.family, line.name, danger, line.summary
        ));
    }
    out
}

/// Machine-readable listing, same shape as MCP `tools/list`
pub fn describe(dispatcher: &Dispatcher, filter: &Filter) -> Vec<ToolDescription> {
    let names: Vec<&str> = select(dispatcher, filter).iter().map(|l| l.name).collect();
    dispatcher
        .describe()
        .into_iter()
        .filter(|d| names.contains(&d.name.as_str()))
        .collect()
}
