mod analysis;
mod article;
mod feed;
mod stats;

pub use analysis::{Analysis, Category, Sentiment};
pub use article::{Article, ArticleQuery, ArticleUpdate, InsertOutcome, NewArticle};
pub use feed::FeedSource;
pub use stats::Stats;
