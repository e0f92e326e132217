use adfx_cli::activity::Branch;
use adfx_cli::analysis::Analysis;
use adfx_cli::config::AnalysisConfig;
use adfx_cli::core::{EdgeKind, EntityId, ResourceKind, Warning};
use adfx_cli::test_utils::fixtures::{
    TemplateBuilder, after, copy_activity, execute_pipeline, for_each, wait_activity,
};
use adfx_cli::test_utils::init_test_logging;
use serde_json::json;

fn analyze(builder: TemplateBuilder) -> Analysis {
    init_test_logging(None);
    Analysis::from_value(builder.build(), &AnalysisConfig::default()).unwrap()
}

fn targets(analysis: &Analysis, source: &EntityId, kind: EdgeKind) -> Vec<EntityId> {
    analysis.graph.outgoing(source, Some(kind)).into_iter().map(|e| e.target).collect()
}

/// Pipeline A calls B, and B copies D1 into D2.
#[test]
fn test_execute_pipeline_and_copy_lineage() {
    let analysis = analyze(
        TemplateBuilder::new("MyFactory")
            .linked_service("LS_Blob", "AzureBlobStorage", None)
            .dataset("D1", "DelimitedText", "LS_Blob")
            .dataset("D2", "Parquet", "LS_Blob")
            .pipeline("A", vec![execute_pipeline("Run B", "B")])
            .depends_on("pipelines", "B")
            .pipeline("B", vec![copy_activity("Copy", "D1", "D2")])
            .depends_on("datasets", "D1")
            .depends_on("datasets", "D2"),
    );

    assert_eq!(analysis.catalog.count(ResourceKind::Pipeline), 2);
    assert_eq!(analysis.catalog.count(ResourceKind::Dataset), 2);
    assert!(analysis.warnings.is_empty(), "unexpected warnings: {:?}", analysis.warnings);

    let calls = analysis.graph.edges_of_kind(EdgeKind::PipelineCallsPipeline);
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].source, EntityId::pipeline("A"));
    assert_eq!(calls[0].target, EntityId::pipeline("B"));
    assert!(calls[0].resolved);

    let copy = EntityId::activity("B", "Copy");
    assert_eq!(analysis.graph.edges_of_kind(EdgeKind::ActivityReadsDataset).len(), 1);
    assert_eq!(analysis.graph.edges_of_kind(EdgeKind::ActivityWritesDataset).len(), 1);
    assert_eq!(targets(&analysis, &copy, EdgeKind::ActivityReadsDataset), vec![EntityId::dataset("D1")]);
    assert_eq!(targets(&analysis, &copy, EdgeKind::ActivityWritesDataset), vec![EntityId::dataset("D2")]);

    // ARM-level dependsOn entries go through variables('factoryId')
    assert_eq!(
        targets(&analysis, &EntityId::pipeline("A"), EdgeKind::ResourceDependsOnResource),
        vec![EntityId::pipeline("B")]
    );
    assert_eq!(
        targets(&analysis, &EntityId::dataset("D1"), EdgeKind::DatasetUsesLinkedService),
        vec![EntityId::linked_service("LS_Blob")]
    );
}

/// Daily trigger T1 starts pipeline A.
#[test]
fn test_schedule_trigger() {
    let analysis = analyze(
        TemplateBuilder::new("MyFactory")
            .pipeline("A", vec![wait_activity("Wait")])
            .trigger("T1", "Day", 1, &["A"]),
    );

    let trigger = analysis.catalog.get(ResourceKind::Trigger, "T1").unwrap();
    let details = trigger.as_trigger().unwrap();
    assert_eq!(details.trigger_type.as_deref(), Some("ScheduleTrigger"));
    assert_eq!(details.runtime_state.as_deref(), Some("Started"));

    let schedule = details.schedule.as_ref().unwrap();
    assert_eq!(schedule.frequency.as_deref(), Some("Day"));
    assert_eq!(schedule.interval, Some(1));
    assert_eq!(schedule.time_zone.as_deref(), Some("UTC"));
    assert_eq!(schedule.start.map(|s| s.to_rfc3339()).as_deref(), Some("2024-01-01T06:00:00+00:00"));

    let fires = analysis.graph.edges_of_kind(EdgeKind::TriggerFiresPipeline);
    assert_eq!(fires.len(), 1);
    assert_eq!(fires[0].source, EntityId::trigger("T1"));
    assert_eq!(fires[0].target, EntityId::pipeline("A"));
    assert!(analysis.warnings.is_empty());
}

#[test]
fn test_catalog_names_are_unique_or_reported() {
    let analysis = analyze(
        TemplateBuilder::new("F")
            .pipeline("PL", vec![wait_activity("First")])
            .pipeline("PL", vec![wait_activity("Second")])
            .dataset("PL", "Parquet", "LS")
            .linked_service("LS", "AzureBlobStorage", None),
    );

    // Same name across kinds is not a collision
    assert_eq!(analysis.catalog.count(ResourceKind::Pipeline), 1);
    assert!(analysis.catalog.contains(ResourceKind::Dataset, "PL"));

    let duplicates: Vec<_> = analysis
        .warnings
        .iter()
        .filter(|w| matches!(w, Warning::DuplicateResourceName { .. }))
        .collect();
    assert_eq!(duplicates.len(), 1);

    let mut seen = std::collections::HashSet::new();
    for resource in analysis.catalog.iter() {
        assert!(seen.insert((resource.kind(), resource.name.clone())));
    }

    // First declaration wins
    let activities = analysis.activities_of("PL").unwrap();
    assert_eq!(activities.activities[0].name, "First");
}

#[test]
fn test_every_execute_pipeline_has_an_edge_from_its_owner() {
    let analysis = analyze(
        TemplateBuilder::new("F")
            .pipeline(
                "Master",
                vec![
                    execute_pipeline("Load", "Load"),
                    after(
                        for_each("PerRegion", vec![execute_pipeline("Transform", "Transform")]),
                        "Load",
                    ),
                ],
            )
            .pipeline("Load", vec![wait_activity("Wait")])
            .pipeline("Transform", vec![execute_pipeline("Publish", "Publish")])
            .pipeline("Publish", vec![wait_activity("Wait")]),
    );

    for pipeline in &analysis.activities {
        let owner = EntityId::pipeline(&pipeline.pipeline);
        let calls = targets(&analysis, &owner, EdgeKind::PipelineCallsPipeline);
        for activity in pipeline.activities.iter().filter(|a| a.is_execute_pipeline()) {
            let target = activity.pipeline_ref.as_ref().unwrap();
            assert!(calls.contains(&EntityId::pipeline(&target.name)), "{} has no call edge", activity.id());
        }
    }

    let nested = analysis.activities_of("Master").unwrap().find("Transform").unwrap();
    assert_eq!(nested.parent.as_deref(), Some("PerRegion"));
    assert_eq!(nested.branch, Some(Branch::Body));
    assert_eq!(nested.depth, 1);

    assert_eq!(
        analysis.graph.transitive_targets(&EntityId::pipeline("Master"), EdgeKind::PipelineCallsPipeline),
        vec![EntityId::pipeline("Load"), EntityId::pipeline("Transform"), EntityId::pipeline("Publish")]
    );
    assert_eq!(
        targets(&analysis, &EntityId::activity("Master", "PerRegion"), EdgeKind::ActivityDependsOnActivity),
        vec![EntityId::activity("Master", "Load")]
    );
    assert!(analysis.warnings.is_empty());
}

#[test]
fn test_self_hosted_runtime_chain() {
    let analysis = analyze(
        TemplateBuilder::new("F")
            .integration_runtime("SHIR", "SelfHosted")
            .linked_service("LS_OnPrem", "SqlServer", Some("SHIR"))
            .dataset("D_Orders", "SqlServerTable", "LS_OnPrem"),
    );

    assert_eq!(
        targets(&analysis, &EntityId::linked_service("LS_OnPrem"), EdgeKind::LinkedServiceUsesIntegrationRuntime),
        vec![EntityId::integration_runtime("SHIR")]
    );
    assert_eq!(
        targets(&analysis, &EntityId::linked_service("LS_OnPrem"), EdgeKind::ResourceDependsOnResource),
        vec![EntityId::integration_runtime("SHIR")]
    );
    assert!(analysis.graph.unresolved_edges().is_empty());
}

#[test]
fn test_dangling_dataset_reference_is_reported_with_suggestion() {
    let analysis = analyze(
        TemplateBuilder::new("F")
            .linked_service("LS", "AzureBlobStorage", None)
            .dataset("D_Sales", "Parquet", "LS")
            .dataset("D_Out", "Parquet", "LS")
            .pipeline("PL", vec![copy_activity("Copy", "D_Salse", "D_Out")]),
    );

    let reads = analysis.graph.edges_of_kind(EdgeKind::ActivityReadsDataset);
    assert_eq!(reads.len(), 1);
    assert!(!reads[0].resolved);

    assert_eq!(analysis.warnings.len(), 1);
    match &analysis.warnings[0] {
        Warning::DanglingReference { to, suggestion, .. } => {
            assert_eq!(to, &EntityId::dataset("D_Salse"));
            assert_eq!(suggestion.as_deref(), Some("D_Sales"));
        }
        other => panic!("unexpected warning {other:?}"),
    }
}

#[test]
fn test_runtime_pipeline_reference() {
    let analysis = analyze(TemplateBuilder::new("F").pipeline(
        "Dispatcher",
        vec![json!({
            "name": "Run",
            "type": "ExecutePipeline",
            "typeProperties": {
                "pipeline": { "referenceName": "@pipeline().parameters.target", "type": "PipelineReference" }
            }
        })],
    ));

    let calls = analysis.graph.edges_of_kind(EdgeKind::PipelineCallsPipeline);
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].target, EntityId::pipeline("<runtime:target>"));
    assert!(!calls[0].resolved);
    assert!(analysis.has_warnings());
}

#[test]
fn test_broken_entries_do_not_stop_the_analysis() {
    let analysis = analyze(
        TemplateBuilder::new("F")
            .pipeline("PL", vec![json!("not an activity"), wait_activity("Wait")])
            .resource("pipelines", "Other", json!({ "activities": [] })),
    );

    assert_eq!(analysis.catalog.count(ResourceKind::Pipeline), 2);
    assert_eq!(analysis.activities_of("PL").unwrap().activities.len(), 1);
    assert!(analysis.warnings.iter().any(|w| matches!(w, Warning::InvalidActivity { .. })));
}
