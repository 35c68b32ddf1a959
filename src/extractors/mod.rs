pub mod operator;

pub use operator::AdminOperator;
