pub mod append;
pub mod benches;
pub mod check;
pub mod config;
pub mod latest;
pub mod series;
pub mod show;
pub mod suites;

pub use append::AppendArgs;
pub use benches::BenchesArgs;
pub use check::CheckArgs;
pub use config::{ConfigAction, ConfigArgs};
pub use latest::LatestArgs;
pub use series::SeriesArgs;
pub use show::ShowArgs;
pub use suites::SuitesArgs;
