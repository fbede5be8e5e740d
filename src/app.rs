/// Main application entry point for edskool.
/// Routes a course page to its reviews, the report dialog and the review form.
use crate::client::HttpReviewStore;
use crate::components::{report_dialog::ReportDialog, review_form::ReviewForm, reviews_list::ReviewsList};
use crate::models::review::{Viewer, VoteDirection};
use crate::reconciler::{load_board, perform_report, perform_vote, settle_report, submit_review, ReviewBoard};
use crate::store::ReviewSubmissionStore;
use crate::error::ReviewError;
use leptos::logging::{error, warn};
use leptos::*;
use leptos_meta::*;
use leptos_router::*;

#[component]
pub fn App() -> impl IntoView {
    provide_meta_context();

    view! {
        <Title text="edskool"/>
        <Router>
            <main>
                <h1>{ "edskool" }</h1>
                <Routes>
                    <Route path="/courses/:course_id" view=CoursePage/>
                    <Route path="/*any" view=|| view! { <p>{ "Pick a course to see its reviews." }</p> }/>
                </Routes>
            </main>
        </Router>
    }
}

/// Shows the toast for a failed interaction. Remote failures also keep their cause in the console.
fn show_error(notice: RwSignal<Option<String>>, err: &ReviewError) {
    if err.is_transient() {
        match std::error::Error::source(err) {
            Some(cause) => warn!("[REVIEWS] {}: {}", err, cause),
            None => warn!("[REVIEWS] {}", err),
        }
    }
    notice.set(Some(err.to_string()));
}

#[component]
fn CoursePage() -> impl IntoView {
    let params = use_params_map();
    let query = use_query_map();
    let course_id = move || params.with(|p| p.get("course_id").cloned().unwrap_or_default());
    // Sign-in lives outside this app; the page is told who is looking.
    let viewer: Option<Viewer> = query
        .with_untracked(|q| q.get("viewer").cloned())
        .filter(|id| !id.trim().is_empty())
        .map(Viewer::new);

    let store = HttpReviewStore::default();
    let board = create_rw_signal(ReviewBoard::default());
    let notice = create_rw_signal(None::<String>);
    let submitting = create_rw_signal(false);
    let reload = create_rw_signal(0u32);

    create_effect({
        let store = store.clone();
        let viewer = viewer.clone();
        move |_| {
            let _ = reload.get();
            let course_id = course_id();
            let store = store.clone();
            let viewer = viewer.clone();
            spawn_local(async move {
                match store.reviews_for_course(&course_id).await {
                    Ok(reviews) => board.set(load_board(&store, reviews, viewer.as_ref()).await),
                    Err(e) => {
                        error!("[REVIEWS] Failed to load reviews for {}: {}", course_id, e);
                        notice.set(Some("Failed to load reviews".to_string()));
                    }
                }
            });
        }
    });

    let on_vote = Callback::new({
        let store = store.clone();
        let viewer = viewer.clone();
        move |(review_id, direction): (String, VoteDirection)| {
            let plan = match board.with_untracked(|b| b.plan_vote(viewer.as_ref(), &review_id, direction)) {
                Ok(plan) => plan,
                Err(e) => return show_error(notice, &e),
            };
            let store = store.clone();
            // No in-flight guard: the last answer to land wins.
            spawn_local(async move {
                match perform_vote(&store, &plan).await {
                    Ok(outcome) => board.update(|b| *b = b.apply_vote(&plan, &outcome)),
                    Err(e) => show_error(notice, &e),
                }
            });
        }
    });

    let on_report = Callback::new({
        let viewer = viewer.clone();
        move |review_id: String| match board.with_untracked(|b| b.open_report(viewer.as_ref(), &review_id)) {
            Ok(next) => board.set(next),
            Err(e) => show_error(notice, &e),
        }
    });

    let on_reason = Callback::new(move |reason: String| board.update(|b| *b = b.with_report_reason(reason)));
    let on_close = Callback::new(move |_: ()| board.update(|b| *b = b.close_report()));

    let on_submit_report = Callback::new({
        let store = store.clone();
        let viewer = viewer.clone();
        move |_: ()| {
            let plan = match board.with_untracked(|b| b.plan_drafted_report(viewer.as_ref())) {
                Ok(plan) => plan,
                Err(e) => return show_error(notice, &e),
            };
            let store = store.clone();
            submitting.set(true);
            spawn_local(async move {
                let result = perform_report(&store, &plan).await;
                board.update(|b| *b = settle_report(b, &plan, &result));
                match result {
                    Ok(()) => notice.set(Some("Report submitted successfully".to_string())),
                    Err(e) => show_error(notice, &e),
                }
                submitting.set(false);
            });
        }
    });

    let on_submit_review = Callback::new({
        let store = store.clone();
        let viewer = viewer.clone();
        move |(rating, comment): (u8, String)| {
            let store = store.clone();
            let viewer = viewer.clone();
            let course_id = params.with_untracked(|p| p.get("course_id").cloned().unwrap_or_default());
            spawn_local(async move {
                match submit_review(&store, viewer.as_ref(), &course_id, rating, &comment).await {
                    Ok(_) => {
                        notice.set(Some("Review submitted successfully".to_string()));
                        reload.update(|n| *n += 1);
                    }
                    Err(e) => show_error(notice, &e),
                }
            });
        }
    });

    let signed_in = viewer.is_some();

    view! {
        <section class="course">
            {move || notice.get().map(|message| view! {
                <div class="toast" on:click=move |_| notice.set(None)>{ message }</div>
            })}
            <Show
                when=move || signed_in
                fallback=|| view! { <p>{ "Sign in to write a review" }</p> }
            >
                <ReviewForm on_submit=on_submit_review/>
            </Show>
            <ReviewsList board=board viewer=viewer.clone() on_vote=on_vote on_report=on_report/>
            <ReportDialog
                board=board
                submitting=submitting
                on_reason=on_reason
                on_submit=on_submit_report
                on_close=on_close
            />
        </section>
    }
}
