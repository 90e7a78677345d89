use arrange::db::Database;
use arrange::driver::CommitBackend;
use arrange::models::*;
use speculate2::speculate;
use uuid::Uuid;

fn new_member(
    parent: ContainerRef,
    name: &str,
    kind: MemberKind,
    order: u32,
    path: &[&str],
) -> NewMember {
    NewMember {
        id: Uuid::new_v4(),
        parent,
        name: name.to_string(),
        kind,
        order,
        path: path.iter().copied().collect(),
    }
}

fn create_all(db: &Database, container: ContainerRef, creates: Vec<NewMember>) -> Vec<Uuid> {
    let ids = creates.iter().map(|create| create.id).collect();
    let mut batch = Batch::new(container);
    batch.creates = creates;
    db.apply_batch(&batch).expect("Failed to create members");
    ids
}

speculate! {
    before {
        let db = Database::open_memory().expect("Failed to create in-memory database");
        db.migrate().expect("Failed to run migrations");
    }

    describe "roots" {
        it "starts with an empty workspace" {
            let workspace = db.load_workspace().expect("Query failed");
            assert!(workspace.roots.is_empty());
        }

        it "lists roots in creation order with their kind" {
            db.create_root("Project", CollectionKind::Tree).expect("Failed to create");
            db.create_root("Globals", CollectionKind::FlatList).expect("Failed to create");
            db.create_root("Groups", CollectionKind::GroupedList).expect("Failed to create");

            let roots = db.list_roots().expect("Query failed");
            let names: Vec<&str> = roots.iter().map(|r| r.name.as_str()).collect();
            assert_eq!(names, vec!["Project", "Globals", "Groups"]);
            assert_eq!(roots[1].kind, CollectionKind::FlatList);
            assert_eq!(roots[2].kind, CollectionKind::GroupedList);
            let orders: Vec<u32> = roots.iter().map(|r| r.order).collect();
            assert_eq!(orders, vec![1, 2, 3]);
        }
    }

    describe "apply_root_batch" {
        it "lists roots by their stored order" {
            let project = db.create_root("Project", CollectionKind::Tree).unwrap();
            let globals = db.create_root("Globals", CollectionKind::FlatList).unwrap();

            let batch = RootBatch {
                updates: vec![
                    RootUpdate { id: project.id, order: 2 },
                    RootUpdate { id: globals.id, order: 1 },
                ],
            };
            db.apply_root_batch(&batch).expect("Failed to apply");

            let names: Vec<String> = db.list_roots().unwrap().into_iter().map(|r| r.name).collect();
            assert_eq!(names, vec!["Globals", "Project"]);
            let created = db.create_root("Groups", CollectionKind::GroupedList).unwrap();
            assert_eq!(created.order, 3);
        }

        it "rolls back when a root is unknown" {
            let project = db.create_root("Project", CollectionKind::Tree).unwrap();
            let batch = RootBatch {
                updates: vec![
                    RootUpdate { id: project.id, order: 2 },
                    RootUpdate { id: Uuid::new_v4(), order: 1 },
                ],
            };

            assert!(db.apply_root_batch(&batch).is_err());
            assert_eq!(db.list_roots().unwrap()[0].order, 1);
        }

        it "commits through the backend trait" {
            let project = db.create_root("Project", CollectionKind::Tree).unwrap();
            let globals = db.create_root("Globals", CollectionKind::FlatList).unwrap();
            let batch = RootBatch {
                updates: vec![
                    RootUpdate { id: globals.id, order: 1 },
                    RootUpdate { id: project.id, order: 2 },
                ],
            };

            tokio_test::block_on(db.commit_root_batch(&batch)).expect("Commit failed");

            let workspace = db.load_workspace().unwrap();
            assert_eq!(workspace.roots[0].id, globals.id);
            assert!(arrange::tree::validate(&workspace).is_empty());
        }
    }

    describe "load_workspace" {
        it "nests members and sorts siblings by order" {
            let root = db.create_root("Project", CollectionKind::Tree).unwrap();
            let top = root.container_ref();
            let ids = create_all(&db, top, vec![
                new_member(top, "health", MemberKind::Leaf, 2, &["health"]),
                new_member(top, "api", MemberKind::Interior, 1, &["api"]),
            ]);
            let api = ContainerRef::node(root.id, ids[1]);
            create_all(&db, api, vec![
                new_member(api, "logout", MemberKind::Leaf, 2, &["api", "logout"]),
                new_member(api, "login", MemberKind::Leaf, 1, &["api", "login"]),
            ]);

            let workspace = db.load_workspace().unwrap();
            let members = &workspace.roots[0].members;
            assert_eq!(members[0].name, "api");
            assert_eq!(members[1].name, "health");
            let children: Vec<&str> = members[0].children.iter().map(|m| m.name.as_str()).collect();
            assert_eq!(children, vec!["login", "logout"]);
            assert_eq!(members[0].children[1].path.to_string(), "api/logout");
            assert!(arrange::tree::validate(&workspace).is_empty());
        }
    }

    describe "apply_batch" {
        it "updates only the fields a command carries" {
            let root = db.create_root("Globals", CollectionKind::FlatList).unwrap();
            let top = root.container_ref();
            let ids = create_all(&db, top, vec![
                new_member(top, "dev", MemberKind::Leaf, 1, &["dev"]),
                new_member(top, "prod", MemberKind::Leaf, 2, &["prod"]),
            ]);

            let mut batch = Batch::new(top);
            let mut update = UpdateCommand::new(ids[0]);
            update.order = Some(2);
            batch.updates.push(update);
            let mut update = UpdateCommand::new(ids[1]);
            update.order = Some(1);
            update.name = Some("production".to_string());
            update.path = Some(NodePath::new(vec!["production".to_string()]));
            batch.updates.push(update);
            db.apply_batch(&batch).expect("Failed to apply");

            let workspace = db.load_workspace().unwrap();
            let members = &workspace.roots[0].members;
            assert_eq!(members[0].name, "production");
            assert_eq!(members[0].path.to_string(), "production");
            assert_eq!(members[1].name, "dev");
            assert_eq!(members[1].order, 2);
        }

        it "re-homes a subtree into another root" {
            let from = db.create_root("From", CollectionKind::Tree).unwrap();
            let to = db.create_root("To", CollectionKind::Tree).unwrap();
            let from_top = from.container_ref();
            let dir = create_all(&db, from_top, vec![
                new_member(from_top, "auth", MemberKind::Interior, 1, &["auth"]),
            ])[0];
            let dir_ref = ContainerRef::node(from.id, dir);
            let child = create_all(&db, dir_ref, vec![
                new_member(dir_ref, "login", MemberKind::Leaf, 1, &["auth", "login"]),
            ])[0];

            let to_top = to.container_ref();
            let mut batch = Batch::new(to_top);
            let mut moved = UpdateCommand::new(dir);
            moved.parent = Some(to_top);
            batch.updates.push(moved);
            let mut descendant = UpdateCommand::new(child);
            descendant.parent = Some(ContainerRef::node(to.id, dir));
            batch.updates.push(descendant);
            db.apply_batch(&batch).expect("Failed to apply");

            let workspace = db.load_workspace().unwrap();
            assert!(workspace.root(from.id).unwrap().members.is_empty());
            let located = workspace.locate(child).unwrap();
            assert_eq!(located.container, ContainerRef::node(to.id, dir));
        }

        it "cascades deletes to descendants" {
            let root = db.create_root("Project", CollectionKind::Tree).unwrap();
            let top = root.container_ref();
            let dir = create_all(&db, top, vec![
                new_member(top, "auth", MemberKind::Interior, 1, &["auth"]),
            ])[0];
            let dir_ref = ContainerRef::node(root.id, dir);
            let child = create_all(&db, dir_ref, vec![
                new_member(dir_ref, "login", MemberKind::Leaf, 1, &["auth", "login"]),
            ])[0];

            let mut batch = Batch::new(top);
            batch.deletes.push(dir);
            db.apply_batch(&batch).expect("Failed to apply");

            assert!(!db.member_exists(dir).unwrap());
            assert!(!db.member_exists(child).unwrap());
        }

        it "rolls back the whole batch when one command fails" {
            let root = db.create_root("Project", CollectionKind::Tree).unwrap();
            let top = root.container_ref();
            let fresh = new_member(top, "new", MemberKind::Leaf, 1, &["new"]);
            let fresh_id = fresh.id;

            let mut batch = Batch::new(top);
            batch.creates.push(fresh);
            let mut missing = UpdateCommand::new(Uuid::new_v4());
            missing.order = Some(1);
            batch.updates.push(missing);

            assert!(db.apply_batch(&batch).is_err());
            assert!(!db.member_exists(fresh_id).unwrap());
        }
    }

    describe "commit_batch" {
        it "commits through the backend trait" {
            let root = db.create_root("Project", CollectionKind::Tree).unwrap();
            let top = root.container_ref();
            let mut batch = Batch::new(top);
            batch.creates.push(new_member(top, "health", MemberKind::Leaf, 1, &["health"]));

            tokio_test::block_on(db.commit_batch(&batch)).expect("Commit failed");

            let workspace = db.load_workspace().unwrap();
            assert_eq!(workspace.roots[0].members[0].name, "health");
        }

        it "reports storage errors as commit errors" {
            let mut batch = Batch::new(ContainerRef::root(Uuid::new_v4()));
            let mut update = UpdateCommand::new(Uuid::new_v4());
            update.order = Some(3);
            batch.updates.push(update);

            let result = tokio_test::block_on(db.commit_batch(&batch));
            assert!(matches!(result, Err(arrange::error::CommitError::Storage(_))));
        }
    }

    describe "on disk" {
        it "persists across reopen" {
            let dir = tempfile::tempdir().unwrap();
            let path = dir.path().join("data").join("arrange.db");
            let root_id = {
                let disk = Database::open(path.clone()).unwrap();
                disk.migrate().unwrap();
                disk.create_root("Project", CollectionKind::Tree).unwrap().id
            };

            let disk = Database::open(path).unwrap();
            disk.migrate().unwrap();
            let workspace = disk.load_workspace().unwrap();
            assert_eq!(workspace.roots[0].id, root_id);
        }
    }
}
