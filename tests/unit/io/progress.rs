//! Tests for batch progress tracking

#[cfg(test)]
mod tests {
    use std::path::Path;

    use rayon::prelude::*;
    use visual_complexity::io::progress::ProgressManager;

    // Tests hidden bars still count completed images
    // Verified by skipping the increment when hidden
    #[test]
    fn test_hidden_progress_counts() {
        let progress = ProgressManager::new(3, false);
        progress.complete(Path::new("a.png"));
        progress.complete(Path::new("dir/b.png"));
        assert_eq!(progress.position(), 2);
        progress.finish();
    }

    // Tests completions from worker threads are all recorded
    // Verified by cloning the bar state per worker
    #[test]
    fn test_parallel_completions() {
        let progress = ProgressManager::new(64, false);
        (0..64).into_par_iter().for_each(|index| {
            progress.complete(Path::new(&format!("image_{index}.png")));
        });
        assert_eq!(progress.position(), 64);
    }

    // Tests paths without a file name are accepted
    // Verified by unwrapping the file name
    #[test]
    fn test_complete_without_file_name() {
        let progress = ProgressManager::new(1, false);
        progress.complete(Path::new("/"));
        assert_eq!(progress.position(), 1);
    }
}
