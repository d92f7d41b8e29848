use bucket_publish::config::InputLayout;
use bucket_publish::resolve::{read_mapping, resolve_pairs, FilePair};
use std::fs::{create_dir_all, File};
use std::io::Write;
use std::path::PathBuf;
use tempfile::tempdir;

fn touch(path: &PathBuf, content: &str) {
    create_dir_all(path.parent().unwrap()).unwrap();
    write!(File::create(path).unwrap(), "{content}").unwrap();
}

#[test]
fn test_split_layout_matches_content_with_metadata() {
    let tmp = tempdir().unwrap();
    let json_folder = tmp.path().join("json");
    let meta_folder = tmp.path().join("meta");
    touch(&json_folder.join("act_1.json"), "{}");
    touch(&meta_folder.join("metadata_act_1.json"), "{}");

    let layout = InputLayout::Split {
        json_folder: json_folder.clone(),
        meta_folder: meta_folder.clone(),
    };
    let pairs = resolve_pairs(&layout).unwrap();

    assert_eq!(pairs.len(), 1);
    assert_eq!(pairs[0].content_path, json_folder.join("act_1.json"));
    assert_eq!(
        pairs[0].metadata_path,
        Some(meta_folder.join("metadata_act_1.json"))
    );
}

#[test]
fn test_unmatched_content_gets_pair_without_metadata() {
    let tmp = tempdir().unwrap();
    let json_folder = tmp.path().join("json");
    let meta_folder = tmp.path().join("meta");
    touch(&json_folder.join("act_7.json"), "{}");
    touch(&meta_folder.join("metadata_act_1.json"), "{}");

    let layout = InputLayout::Split {
        json_folder,
        meta_folder,
    };
    let pairs = resolve_pairs(&layout).unwrap();

    assert_eq!(pairs.len(), 1);
    assert_eq!(pairs[0].metadata_path, None);
}

#[test]
fn test_combined_layout_splits_on_metadata_token() {
    let tmp = tempdir().unwrap();
    let input = tmp.path().join("input");
    touch(&input.join("act_1.json"), "{}");
    touch(&input.join("metadata_act_1.json"), "{}");
    touch(&input.join("nested/act_2.json"), "{}");
    touch(&input.join("nested/metadata_act_2.json"), "{}");

    let layout = InputLayout::Combined {
        input_folder: input.clone(),
        metadata_token: "metadata_act".to_string(),
    };
    let pairs = resolve_pairs(&layout).unwrap();

    assert_eq!(pairs.len(), 2);
    for pair in &pairs {
        assert!(
            pair.metadata_path.is_some(),
            "pair for {} should have matched",
            pair.content_path.display()
        );
    }
}

#[test]
fn test_empty_input_yields_empty_sequence() {
    let tmp = tempdir().unwrap();
    let layout = InputLayout::Split {
        json_folder: tmp.path().join("json"),
        meta_folder: tmp.path().join("meta"),
    };
    let pairs = resolve_pairs(&layout).unwrap();
    assert!(pairs.is_empty());
}

/// Resolving twice over an unchanged tree yields the identical sequence.
#[test]
fn test_resolution_is_deterministic() {
    let tmp = tempdir().unwrap();
    let json_folder = tmp.path().join("json");
    let meta_folder = tmp.path().join("meta");
    for i in 0..5 {
        touch(&json_folder.join(format!("act_{i}.json")), "{}");
        touch(&meta_folder.join(format!("metadata_act_{i}.json")), "{}");
    }
    // Duplicate candidate for act_0: the first match in sorted order wins.
    touch(&meta_folder.join("a_metadata_act_0.json"), "{}");

    let layout = InputLayout::Split {
        json_folder,
        meta_folder,
    };
    let first = resolve_pairs(&layout).unwrap();
    let second = resolve_pairs(&layout).unwrap();

    assert_eq!(first, second);
    assert_eq!(
        first[0].metadata_path.as_ref().unwrap().file_name().unwrap(),
        "a_metadata_act_0.json"
    );
}

#[test]
fn test_mapping_file_is_read_verbatim() {
    let tmp = tempdir().unwrap();
    let mapping = tmp.path().join("mapping.csv");
    let mut file = File::create(&mapping).unwrap();
    writeln!(file, "JSON,METADATA").unwrap();
    writeln!(file, "/data/act_1.json,/data/metadata_act_1.json").unwrap();
    writeln!(file, "/data/act_2.json,").unwrap();
    drop(file);

    let pairs = read_mapping(&mapping).unwrap();
    assert_eq!(
        pairs,
        vec![
            FilePair {
                content_path: PathBuf::from("/data/act_1.json"),
                metadata_path: Some(PathBuf::from("/data/metadata_act_1.json")),
            },
            FilePair {
                content_path: PathBuf::from("/data/act_2.json"),
                metadata_path: None,
            },
        ]
    );
}

#[test]
fn test_mapping_file_header_is_case_insensitive() {
    let tmp = tempdir().unwrap();
    let mapping = tmp.path().join("mapping.csv");
    let mut file = File::create(&mapping).unwrap();
    writeln!(file, "json, metadata").unwrap();
    writeln!(file, "/data/act_1.json,/data/metadata_act_1.json").unwrap();
    drop(file);

    let pairs = read_mapping(&mapping).unwrap();
    assert_eq!(pairs.len(), 1);
    assert!(pairs[0].metadata_path.is_some());
}

#[test]
fn test_mapping_file_without_required_columns_errors() {
    let tmp = tempdir().unwrap();
    let mapping = tmp.path().join("mapping.csv");
    let mut file = File::create(&mapping).unwrap();
    writeln!(file, "A,B").unwrap();
    writeln!(file, "x,y").unwrap();
    drop(file);

    assert!(read_mapping(&mapping).is_err());
}
