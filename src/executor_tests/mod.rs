mod build;
mod executor;
mod interfaces_unions;
mod middleware;
