//! Choosing which file of a swarm to play.

use crate::swarm::SwarmFile;

/// Container extensions treated as directly playable video.
pub const VIDEO_EXTENSIONS: &[&str] = &["mp4", "mkv", "avi"];

/// Picks the file to stream once metadata is known.
pub trait FileSelector: Send + Sync {
    /// Index into `files`, or `None` when nothing is playable.
    fn select(&self, files: &[SwarmFile]) -> Option<usize>;
}

/// First video file in listing order, else the largest file.
#[derive(Debug, Clone, Copy, Default)]
pub struct VideoFirst;

impl FileSelector for VideoFirst {
    fn select(&self, files: &[SwarmFile]) -> Option<usize> {
        select_playable_file(files)
    }
}

pub fn select_playable_file(files: &[SwarmFile]) -> Option<usize> {
    if let Some(idx) = files.iter().position(|f| is_video(&f.name)) {
        return Some(idx);
    }
    // max_by_key returns the last maximum; ties go to the first listed file
    files
        .iter()
        .enumerate()
        .rev()
        .max_by_key(|(_, f)| f.size_bytes)
        .map(|(idx, _)| idx)
}

fn is_video(name: &str) -> bool {
    name.rsplit_once('.')
        .map(|(_, ext)| {
            VIDEO_EXTENSIONS
                .iter()
                .any(|v| ext.eq_ignore_ascii_case(v))
        })
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    const MB: u64 = 1024 * 1024;

    fn files(entries: &[(&str, u64)]) -> Vec<SwarmFile> {
        entries
            .iter()
            .map(|(name, size)| SwarmFile::new(*name, *size))
            .collect()
    }

    #[test]
    fn test_prefers_video_extension() {
        let list = files(&[("sample.txt", 10), ("movie.mkv", 5), ("extra.nfo", 900)]);
        let idx = select_playable_file(&list).unwrap();
        assert_eq!(list[idx].name, "movie.mkv");
    }

    #[test]
    fn test_first_video_wins_over_larger_video() {
        let list = files(&[("a.avi", 10), ("b.mp4", 5000)]);
        assert_eq!(select_playable_file(&list), Some(0));
    }

    #[test]
    fn test_extension_match_is_case_insensitive() {
        let list = files(&[("readme.txt", 100), ("Movie.MP4", 10)]);
        assert_eq!(select_playable_file(&list), Some(1));
    }

    #[test]
    fn test_falls_back_to_largest() {
        let list = files(&[("a.bin", 500 * MB), ("b.bin", 50 * MB)]);
        let idx = select_playable_file(&list).unwrap();
        assert_eq!(list[idx].name, "a.bin");

        let reversed = files(&[("b.bin", 50 * MB), ("a.bin", 500 * MB)]);
        assert_eq!(select_playable_file(&reversed), Some(1));
    }

    #[test]
    fn test_largest_tie_keeps_listing_order() {
        let list = files(&[("one.iso", 7), ("two.iso", 7)]);
        assert_eq!(select_playable_file(&list), Some(0));
    }

    #[test]
    fn test_nested_paths_use_file_name() {
        let list = files(&[("Show/Season 1/notes.txt", 1), ("Show/Season 1/ep01.mkv", 2)]);
        assert_eq!(VideoFirst.select(&list), Some(1));
    }

    #[test]
    fn test_extension_must_be_a_suffix() {
        let list = files(&[("mkv.txt", 1), ("mp4", 3)]);
        assert_eq!(select_playable_file(&list), Some(1));
    }

    #[test]
    fn test_empty_list() {
        assert_eq!(select_playable_file(&[]), None);
    }
}
