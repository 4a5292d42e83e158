use crate::util::*;

#[test]
fn while_loop() {
    assert_eq!(run("int main(){ int i; i=0; while(i<10){ i=i+1; } return i; }"), 10);
}

#[test]
fn while_loop_with_false_condition_never_runs() {
    assert_eq!(run("int main(){ int i; i=0; while(i<0){ i=i+1; } return i; }"), 0);
}

#[test]
fn for_loop() {
    assert_eq!(run("int main(){ int i; int s; s=0; for(i=0;i<5;i=i+1){ s=s+i; } return s; }"), 10);
}

#[test]
fn for_loop_with_declared_counter() {
    assert_eq!(run("int main(){ int s; s=0; for(int i = 0;i<4;++i){ s=s+i; } return s; }"), 6);
}

#[test]
fn break_leaves_the_loop() {
    assert_eq!(run("int main(){ int i; for(i=0;i<100;i=i+1){ if(i==7){ break; } } return i; }"), 7);
    assert_eq!(run("int main(){ int i; i=0; while(i<100){ if(i==5){ break; } i=i+1; } return i; }"), 5);
}

#[test]
fn continue_in_while() {
    assert_eq!(run("
        int main(){
            int i; i = 0;
            int s; s = 0;
            while(i < 5){
                i = i + 1;
                if(i == 3){ continue; }
                s = s + i;
            }
            return s;
        }
    "), 12);
}

#[test]
fn continue_in_for_runs_the_post_loop_statement() {
    assert_eq!(run("
        int main(){
            int s; s = 0;
            int i;
            for(i = 0; i < 5; ++i){
                if(i == 2){ continue; }
                s = s + i;
            }
            return s;
        }
    "), 8);
}

#[test]
fn nested_loops_with_break() {
    assert_eq!(run("
        int main(){
            int total; total = 0;
            int i; int j;
            for(i = 0; i < 3; i = i + 1){
                for(j = 0; j < 10; j = j + 1){
                    if(j == 2){ break; }
                    total = total + 1;
                }
            }
            return total;
        }
    "), 6);
}

#[test]
fn if_without_else() {
    assert_eq!(run("int main(){ int x; x=1; if(x<2){ x=10; } return x; }"), 10);
    assert_eq!(run("int main(){ int x; x=5; if(x<2){ x=10; } return x; }"), 5);
}

#[test]
fn if_else_branches() {
    assert_eq!(run("int main(){ int x; x=1; if(x<2){ x=10; } else { x=20; } return x; }"), 10);
    assert_eq!(run("int main(){ int x; x=5; if(x<2){ x=10; } else { x=20; } return x; }"), 20);
}

#[test]
fn else_if_chain() {
    let source = "
        int classify(int x){
            if(x < 10){ return 1; }
            else if(x < 20){ return 2; }
            else { return 3; }
        }
        int main(){ return classify(5)*100 + classify(15)*10 + classify(25); }
    ";
    assert_eq!(run(source), 123);
}

#[test]
fn single_statement_bodies() {
    assert_eq!(run("int main(){ int i; i=0; while(i<3) i = i + 1; return i; }"), 3);
    assert_eq!(run("int main(){ int x; x=0; if(1<2) x = 7; return x; }"), 7);
}

#[test]
fn return_inside_loop() {
    assert_eq!(run("int main(){ int i; for(i=0;i<10;++i){ if(i==4){ return i; } } return 0; }"), 4);
}

#[test]
fn float_condition_is_truthy_when_non_zero() {
    assert_eq!(run("int main(){ float x; x = 0.5; if(x){ return 1; } return 0; }"), 1);
    assert_eq!(run("int main(){ float x; x = 0.0; if(x){ return 1; } return 0; }"), 0);
}
