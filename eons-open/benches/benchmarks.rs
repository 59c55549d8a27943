// SPDX-FileCopyrightText: 2025 RAprogramm <andrey.rozanov.vl@gmail.com>
//
// SPDX-License-Identifier: MIT

use criterion::{Criterion, black_box, criterion_group, criterion_main};
use eons_open::{
    ContributionRegistry, Document, ElementSpec, Selector, TemplateContext, UrlNormalizer,
    VirtualDocument, extract_branch_name, render_or_fallback, render_template,
};

fn benchmark_normalization(c: &mut Criterion,)
{
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()
        .expect("failed to build runtime",);
    let normalizer = UrlNormalizer::default();
    let urls = [
        "https://github.com/rust-lang/rust/pull/12345/files",
        "https://github.com/rust-lang/rust/tree/feature/async-closures",
        "https://gitlab.com/gitlab-org/gitlab/-/blob/master/app/models/project.rb",
        "https://example.com/not/a/forge",
    ];
    let document = VirtualDocument::new(urls[0],);

    c.bench_function("canonical_url_mixed_hosts", |b| {
        b.iter(|| {
            for url in urls {
                let canonical = runtime.block_on(normalizer.canonical_url(black_box(url,), &document,),);
                black_box(canonical,);
            }
        },)
    },);

    c.bench_function("extract_branch_name", |b| {
        b.iter(|| extract_branch_name(black_box("https://gitlab.com/o/r/-/tree/release%2F1.0?ref_type=heads",),),)
    },);
}

fn benchmark_template_rendering(c: &mut Criterion,)
{
    let context = TemplateContext::new("https://github.com/rust-lang/rust/tree/master", Some("master".to_owned(),),);

    c.bench_function("render_default_template", |b| {
        b.iter(|| {
            render_template(
                black_box("https://workspace.infrastructure.tech/#/cast/dev?kasm_url={{repoUrl}}",),
                &context,
            )
            .expect("render failed",)
        },)
    },);

    c.bench_function("render_filter_chain", |b| {
        b.iter(|| {
            render_template(
                black_box("https://ide.example/?repo={{repoUrl|encode}}&ref={{ branchName | slice:0,8 | upper }}",),
                &context,
            )
            .expect("render failed",)
        },)
    },);

    c.bench_function("render_fallback", |b| {
        b.iter(|| render_or_fallback(black_box("https://x/?u={{repoUrl",), &context,),)
    },);
}

fn benchmark_anchor_lookup(c: &mut Criterion,)
{
    let document = VirtualDocument::new("https://github.com/o/r",);
    let body = document.append(document.root(), &ElementSpec::new("body",),).expect("append failed",);
    for index in 0..200 {
        document
            .append(body, &ElementSpec::new("div",).with_class(format!("filler-{index}"),),)
            .expect("append failed",);
    }
    document
        .append(
            body,
            &ElementSpec::new("div",)
                .with_id("repository-details-container",)
                .with_child(ElementSpec::new("ul",).with_child(ElementSpec::new("li",),),),
        )
        .expect("append failed",);

    let contribution = ContributionRegistry::builtin().get("gh-repo",).expect("builtin contribution",);
    let css = Selector::css("#repository-details-container > ul",);

    c.bench_function("query_xpath_anchor", |b| {
        b.iter(|| document.query(black_box(&contribution.selector,),).expect("query failed",),)
    },);

    c.bench_function("query_css_anchor", |b| b.iter(|| document.query(black_box(&css,),).expect("query failed",),),);
}

criterion_group!(benches, benchmark_normalization, benchmark_template_rendering, benchmark_anchor_lookup);
criterion_main!(benches);
