//! Plugin engine test support and suites


mod scanner_tests;
