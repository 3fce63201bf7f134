//! Fixed-width deployment report.
//!
//! Scripts parse this output, so the layout is fixed: a 9 column state field, a
//! name field one column wider than the longest registered name (or the `Name`
//! label, whichever is wider), a 43 column address field, then the init code hash.

use std::io::Write;

use unicode_width::UnicodeWidthStr;

use crate::deployment::{Deployment, DeploymentStatus};

/// Width of the state column.
pub const STATE_WIDTH: usize = 9;
/// Width of the address column (`0x` + 40 hex digits + 1).
pub const ADDRESS_WIDTH: usize = 43;

const NAME_LABEL: &str = "Name";

/// State label of a report row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
pub enum ReportState {
    Found,
    Creating,
}

impl From<DeploymentStatus> for ReportState {
    fn from(status: DeploymentStatus) -> Self {
        match status {
            DeploymentStatus::Found => Self::Found,
            DeploymentStatus::Unresolved | DeploymentStatus::Created => Self::Creating,
        }
    }
}

/// Pad `text` with spaces up to `width` terminal columns.
pub fn pad(text: &str, width: usize) -> String {
    let mut padded = String::from(text);
    let fill = width.saturating_sub(text.width());
    padded.extend(std::iter::repeat_n(' ', fill));
    padded
}

/// Writes report lines to an output sink.
#[derive(Debug)]
pub struct Reporter<W> {
    out: W,
}

impl<W: Write> Reporter<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn get_ref(&self) -> &W {
        &self.out
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    /// Header row. `name_width` is the display width of the longest name.
    pub fn header(&mut self, name_width: usize) -> std::io::Result<()> {
        let line = format_header(name_width);
        writeln!(self.out, "{line}")
    }

    pub fn row(
        &mut self,
        state: ReportState,
        deployment: &Deployment,
        name_width: usize,
    ) -> std::io::Result<()> {
        let line = format_row(state, deployment, name_width);
        writeln!(self.out, "{line}")
    }

    /// Blank line closing a full batch.
    pub fn separator(&mut self) -> std::io::Result<()> {
        writeln!(self.out)?;
        self.out.flush()
    }
}

/// Width of the name column: the longest name plus one, never narrower than the label.
fn name_column(name_width: usize) -> usize {
    name_width.max(NAME_LABEL.width()) + 1
}

pub fn format_header(name_width: usize) -> String {
    format!(
        "{}{}{}Initcode hash",
        pad("State", STATE_WIDTH),
        pad(NAME_LABEL, name_column(name_width)),
        pad("Address", ADDRESS_WIDTH),
    )
}

pub fn format_row(state: ReportState, deployment: &Deployment, name_width: usize) -> String {
    format!(
        "{}{}{}{}",
        pad(&state.to_string(), STATE_WIDTH),
        pad(&deployment.name, name_column(name_width)),
        pad(&deployment.address.to_string(), ADDRESS_WIDTH),
        deployment.fingerprint,
    )
}
