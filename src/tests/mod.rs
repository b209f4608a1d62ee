mod integration_tests;
mod repo_tests;
