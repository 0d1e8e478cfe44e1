// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use std::cell::RefCell;
use std::collections::{HashMap, HashSet};

#[yare::parameterized(
    no_such_file = { ErrorCode::SFTP(FX_NO_SUCH_FILE), io::ErrorKind::NotFound },
    no_such_path = { ErrorCode::SFTP(FX_NO_SUCH_PATH), io::ErrorKind::NotFound },
    permission   = { ErrorCode::SFTP(3),               io::ErrorKind::Other },
    session      = { ErrorCode::Session(-7),           io::ErrorKind::Other },
)]
fn sftp_status_maps_to_io_kind(code: ErrorCode, kind: io::ErrorKind) {
    let err = ssh2::Error::new(code, "sftp failure");
    assert_eq!(to_io(err).kind(), kind);
}

type Listing = Option<(ItemKind, Option<u32>)>;

fn dir() -> Listing {
    Some((ItemKind::Directory, Some(0o755)))
}

fn file() -> Listing {
    Some((ItemKind::File, Some(0o644)))
}

/// Children per directory, deliberately listed out of name order.
fn remote_tree() -> HashMap<PathBuf, Vec<(PathBuf, Listing)>> {
    let mut tree = HashMap::new();
    tree.insert(
        PathBuf::from("/data/root"),
        vec![
            (PathBuf::from("/data/root/z.txt"), file()),
            (PathBuf::from("/data/root/b"), dir()),
            (PathBuf::from("/data/root/fifo"), None),
            (PathBuf::from("/data/root/a"), dir()),
        ],
    );
    tree.insert(
        PathBuf::from("/data/root/a"),
        vec![
            (PathBuf::from("/data/root/a/2.txt"), file()),
            (PathBuf::from("/data/root/a/1.txt"), file()),
        ],
    );
    tree.insert(PathBuf::from("/data/root/b"), Vec::new());
    tree
}

#[test]
fn walk_is_preorder_with_siblings_by_name() {
    let tree = remote_tree();

    let entries = walk_from(
        PathBuf::from("/data/root"),
        dir(),
        |path| Ok(tree.get(path).cloned().unwrap_or_default()),
        |listing| *listing,
    )
    .unwrap();

    let paths: Vec<_> = entries.iter().map(|e| e.path.to_str().unwrap()).collect();
    assert_eq!(
        paths,
        vec![
            "/data/root",
            "/data/root/a",
            "/data/root/a/1.txt",
            "/data/root/a/2.txt",
            "/data/root/b",
            "/data/root/z.txt",
        ]
    );
    assert_eq!(entries[2].kind, ItemKind::File);
    assert_eq!(entries[2].mode, Some(0o644));
}

#[test]
fn walk_of_single_file_yields_only_the_root() {
    let entries = walk_from(
        PathBuf::from("/data/f.txt"),
        file(),
        |_| panic!("files are never listed"),
        |listing| *listing,
    )
    .unwrap();

    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].kind, ItemKind::File);
}

#[test]
fn walk_propagates_listing_errors() {
    let result = walk_from(
        PathBuf::from("/data/root"),
        dir(),
        |_| Err(io::Error::from(io::ErrorKind::PermissionDenied)),
        |listing: &Listing| *listing,
    );

    assert_eq!(result.unwrap_err().kind(), io::ErrorKind::PermissionDenied);
}

fn stat_with_perm(perm: u32) -> FileStat {
    FileStat {
        size: None,
        uid: None,
        gid: None,
        perm: Some(perm),
        atime: None,
        mtime: None,
    }
}

#[yare::parameterized(
    directory = { 0o040_755, Some((ItemKind::Directory, Some(0o755))) },
    regular = { 0o100_644, Some((ItemKind::File, Some(0o644))) },
    setuid = { 0o104_755, Some((ItemKind::File, Some(0o4755))) },
    symlink = { 0o120_777, None },
    socket = { 0o140_700, None },
)]
fn listed_entries_are_classified(perm: u32, expected: Listing) {
    assert_eq!(classify(&stat_with_perm(perm)), expected);
}

fn existing(dirs: &[&str], files: &[&str]) -> impl Fn(&Path) -> io::Result<Existing> {
    let dirs: HashSet<PathBuf> = dirs.iter().map(PathBuf::from).collect();
    let files: HashSet<PathBuf> = files.iter().map(PathBuf::from).collect();
    move |path: &Path| {
        Ok(if dirs.contains(path) {
            Existing::Directory
        } else if files.contains(path) {
            Existing::Other
        } else {
            Existing::Missing
        })
    }
}

#[test]
fn missing_parents_are_listed_outermost_first() {
    let missing = missing_dirs(Path::new("/data/a/b/c"), existing(&["/", "/data"], &[])).unwrap();

    assert_eq!(
        missing,
        vec![
            Path::new("/data/a"),
            Path::new("/data/a/b"),
            Path::new("/data/a/b/c"),
        ]
    );
}

#[test]
fn existing_directory_needs_nothing() {
    let missing = missing_dirs(Path::new("/data/a"), existing(&["/data/a"], &[])).unwrap();
    assert!(missing.is_empty());
}

#[test]
fn file_in_the_way_is_an_error() {
    let lookup = existing(&["/data"], &["/data/a"]);

    let err = missing_dirs(Path::new("/data/a/b"), lookup).unwrap_err();

    assert_eq!(err.kind(), io::ErrorKind::AlreadyExists);
}

#[test]
fn mkdir_race_with_another_worker_is_tolerated() {
    let created = RefCell::new(Vec::new());
    let dirs = [Path::new("/data/a"), Path::new("/data/a/b")];

    // The first mkdir loses a race: it fails but the directory now exists
    let result = make_dirs(
        &dirs,
        |dir| {
            if dir == Path::new("/data/a") {
                Err(io::Error::from(io::ErrorKind::Other))
            } else {
                created.borrow_mut().push(dir.to_path_buf());
                Ok(())
            }
        },
        existing(&["/data/a"], &[]),
    );

    assert!(result.is_ok());
    assert_eq!(*created.borrow(), vec![PathBuf::from("/data/a/b")]);
}

#[test]
fn mkdir_failure_without_directory_is_reported() {
    let dirs = [Path::new("/data/a")];

    let result = make_dirs(
        &dirs,
        |_| Err(io::Error::from(io::ErrorKind::PermissionDenied)),
        existing(&[], &[]),
    );

    assert_eq!(result.unwrap_err().kind(), io::ErrorKind::PermissionDenied);
}
