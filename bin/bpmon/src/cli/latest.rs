use bpmon_model::subject::SubjectId;
use clap::Parser;

#[derive(Debug, Parser)]
pub struct LatestConfig {
    /// `<chain>:<owner>` for a producer, `<chain>:<owner>/<node id>` for a node
    #[arg(long, value_parser = subject_parser)]
    pub subject: SubjectId,

    /// Print every record of the subject, oldest first
    #[arg(long)]
    pub history: bool,
}

pub fn subject_parser(subject: &str) -> Result<SubjectId, String> {
    subject.trim().parse()
}
