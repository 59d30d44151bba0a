mod progress;
mod report;
