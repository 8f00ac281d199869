//! Lexer and parser throughput benchmarks.

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use finch_parser::{Arena, DiagList, Lexer, Parser, SpyVisitor, TokenKind};

const SAMPLE_SOURCE: &str = r#"
import { createServer } from 'http';

function fibonacci(n) {
    if (n <= 1) return n;
    return fibonacci(n - 1) + fibonacci(n - 2);
}

class RequestCounter {
    constructor() {
        this.count = 0;
    }

    increment(by = 1) {
        this.count += by;
        return this.count;
    }

    async report(sink) {
        await sink.write(`count=${this.count}`);
    }
}

const counter = new RequestCounter();
const doubled = [1, 2, 3, 4, 5].map(n => n * 2);
const { host, port = 8080, ...extra } = loadConfig();

for (const n of doubled) {
    counter.increment(n);
}

let server = createServer((request, response) => {
    try {
        response.end(`${host}:${port}`);
    } catch (error) {
        console.error(error);
    } finally {
        counter.increment();
    }
});

export { fibonacci, RequestCounter };
"#;

fn bench_lexer(c: &mut Criterion) {
    let mut group = c.benchmark_group("lexer");
    group.throughput(Throughput::Bytes(SAMPLE_SOURCE.len() as u64));

    group.bench_function("sample", |b| {
        b.iter(|| {
            let mut diags = DiagList::new();
            let mut lexer = Lexer::new(black_box(SAMPLE_SOURCE), &mut diags);
            let mut count = 0usize;
            while lexer.peek().kind != TokenKind::Eof {
                count += 1;
                lexer.advance(&mut diags);
            }
            count
        })
    });

    group.finish();
}

fn bench_parser(c: &mut Criterion) {
    let mut group = c.benchmark_group("parser");
    group.throughput(Throughput::Bytes(SAMPLE_SOURCE.len() as u64));

    group.bench_function("module", |b| {
        b.iter(|| {
            let arena = Arena::new();
            let mut parser = Parser::new(&arena, black_box(SAMPLE_SOURCE));
            let mut visitor = SpyVisitor::new();
            parser.parse_and_visit_module(&mut visitor);
            (visitor.visits.len(), arena.allocated_bytes())
        })
    });

    group.finish();
}

criterion_group!(benches, bench_lexer, bench_parser);
criterion_main!(benches);
