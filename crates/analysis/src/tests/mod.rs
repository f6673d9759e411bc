mod aggregate_tests;
mod helpers;
